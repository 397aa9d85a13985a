// src/handlers/submission.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::submission::{GradingResult, SaveAnswersRequest},
    services::submission as service,
    store::DynStore,
};

/// Saves (a draft of) a student's answers for a topic.
pub async fn save_answers(
    State(store): State<DynStore>,
    Path((student_id, topic_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SaveAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = service::save_answers(store.as_ref(), topic_id, student_id, &payload.answers).await?;

    Ok(Json(submission))
}

pub async fn get_submission(
    State(store): State<DynStore>,
    Path((student_id, topic_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let submission = store
        .get_submission(topic_id, student_id)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(submission))
}

/// Grades the latest saved answers and finalizes the submission.
///
/// Responds with the grading counts and the correct-answer snapshots.
pub async fn submit(
    State(store): State<DynStore>,
    Path((student_id, topic_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let record = service::submit(store.as_ref(), topic_id, student_id).await?;

    Ok(Json(GradingResult {
        questions_attempted: record.questions_attempted,
        questions_correct: record.questions_correct,
        questions_incorrect: record.questions_incorrect,
        questions_skipped: record.questions_skipped,
        correct_answers: record.correct_answers.0,
    }))
}

/// Latest grading result of a submission, with its version and timestamp.
pub async fn get_result(
    State(store): State<DynStore>,
    Path(submission_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = service::latest_result(store.as_ref(), submission_id).await?;

    Ok(Json(record))
}
