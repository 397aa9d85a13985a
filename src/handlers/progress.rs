// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::attempt::{CreateAttemptRequest, EvaluateAttemptRequest, ProgressListParams},
    services::progress as service,
    store::DynStore,
};

pub async fn record_attempt(
    State(store): State<DynStore>,
    Path(exercise_id): Path<Uuid>,
    Json(payload): Json<CreateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let attempt = service::record_attempt(
        store.as_ref(),
        exercise_id,
        payload.student_id,
        &payload.response,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Attaches an evaluation score to an attempt. An attempt is scored once.
pub async fn evaluate_attempt(
    State(store): State<DynStore>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<EvaluateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let evaluation = service::evaluate(store.as_ref(), attempt_id, payload.evaluated_score).await?;

    Ok(Json(evaluation))
}

pub async fn student_progress(
    State(store): State<DynStore>,
    Path((case_study_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let progress = service::student_progress(store.as_ref(), case_study_id, student_id).await?;

    Ok(Json(progress))
}

/// Instructor view: progress of every enrolled student, paginated.
pub async fn class_progress(
    State(store): State<DynStore>,
    Path(case_study_id): Path<Uuid>,
    Query(params): Query<ProgressListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = service::class_progress(store.as_ref(), case_study_id, params.cursor, params.limit).await?;

    Ok(Json(page))
}
