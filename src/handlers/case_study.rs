// src/handlers/case_study.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::EnrollRequest,
        case_study::{CreateCaseStudyRequest, CreateExerciseRequest, CreateModuleRequest},
    },
    store::DynStore,
};

pub async fn create_case_study(
    State(store): State<DynStore>,
    Json(payload): Json<CreateCaseStudyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let case_study = store.create_case_study(&payload.title).await?;

    Ok((StatusCode::CREATED, Json(case_study)))
}

pub async fn create_module(
    State(store): State<DynStore>,
    Path(case_study_id): Path<Uuid>,
    Json(payload): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .get_case_study(case_study_id)
        .await?
        .ok_or(AppError::NotFound("Case study not found".to_string()))?;

    let module = store
        .create_module(case_study_id, &payload.title, payload.order_number)
        .await?;

    Ok((StatusCode::CREATED, Json(module)))
}

pub async fn create_exercise(
    State(store): State<DynStore>,
    Path(module_id): Path<Uuid>,
    Json(payload): Json<CreateExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .get_module(module_id)
        .await?
        .ok_or(AppError::NotFound("Module not found".to_string()))?;

    let exercise = store
        .create_exercise(
            module_id,
            &payload.title,
            &payload.prompt,
            payload.order_number,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(exercise)))
}

/// Modules with their exercises, both in order.
pub async fn get_outline(
    State(store): State<DynStore>,
    Path(case_study_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_case_study(case_study_id)
        .await?
        .ok_or(AppError::NotFound("Case study not found".to_string()))?;

    let outline = store.list_outline(case_study_id).await?;

    Ok(Json(outline))
}

pub async fn enroll(
    State(store): State<DynStore>,
    Path(case_study_id): Path<Uuid>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_case_study(case_study_id)
        .await?
        .ok_or(AppError::NotFound("Case study not found".to_string()))?;

    let enrollment = store.enroll(case_study_id, payload.student_id).await?;

    tracing::info!(
        case_study_id = %case_study_id,
        student_id = %payload.student_id,
        "Student enrolled"
    );

    Ok((StatusCode::CREATED, Json(enrollment)))
}
