// src/services/progress.rs

use uuid::Uuid;

use crate::{
    grading::aggregate_progress,
    models::attempt::{Attempt, Enrollment, Evaluation, ProgressPage, StudentProgress},
    models::case_study::ModuleOutline,
    services::ServiceError,
    store::{CourseworkStore, StoreError},
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

async fn require_enrollment(
    store: &dyn CourseworkStore,
    case_study_id: Uuid,
    student_id: Uuid,
) -> Result<Enrollment, ServiceError> {
    let enrollment = store
        .get_enrollment(case_study_id, student_id)
        .await?
        .ok_or(StoreError::NotFound("Enrollment"))?;
    Ok(enrollment)
}

async fn progress_for(
    store: &dyn CourseworkStore,
    outline: &[ModuleOutline],
    enrollment: &Enrollment,
) -> Result<StudentProgress, ServiceError> {
    let attempts = store
        .list_attempts(enrollment.case_study_id, enrollment.student_id)
        .await?;
    let summary = aggregate_progress(outline, &attempts);
    Ok(StudentProgress::new(enrollment, summary))
}

/// Progress and final score of one enrolled student.
pub async fn student_progress(
    store: &dyn CourseworkStore,
    case_study_id: Uuid,
    student_id: Uuid,
) -> Result<StudentProgress, ServiceError> {
    store
        .get_case_study(case_study_id)
        .await?
        .ok_or(StoreError::NotFound("Case study"))?;

    let enrollment = require_enrollment(store, case_study_id, student_id).await?;
    let outline = store.list_outline(case_study_id).await?;

    progress_for(store, &outline, &enrollment).await
}

/// One page of per-student progress for instructors.
///
/// Pages are keyed on the enrollment id. `next_cursor` is `None` once the
/// last enrollment has been returned.
pub async fn class_progress(
    store: &dyn CourseworkStore,
    case_study_id: Uuid,
    cursor: Option<Uuid>,
    limit: Option<i64>,
) -> Result<ProgressPage, ServiceError> {
    store
        .get_case_study(case_study_id)
        .await?
        .ok_or(StoreError::NotFound("Case study"))?;

    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    // One extra row tells us whether another page exists.
    let mut enrollments = store
        .list_enrollments(case_study_id, cursor, limit + 1)
        .await?;
    let has_more = enrollments.len() as i64 > limit;
    enrollments.truncate(limit as usize);

    let next_cursor = if has_more {
        enrollments.last().map(|e| e.id)
    } else {
        None
    };

    let outline = store.list_outline(case_study_id).await?;
    let mut items = Vec::with_capacity(enrollments.len());
    for enrollment in &enrollments {
        items.push(progress_for(store, &outline, enrollment).await?);
    }

    Ok(ProgressPage { items, next_cursor })
}

/// Records a new attempt. The store refreshes the enrollment's completion
/// percentage in the same step.
pub async fn record_attempt(
    store: &dyn CourseworkStore,
    exercise_id: Uuid,
    student_id: Uuid,
    response: &str,
) -> Result<Attempt, ServiceError> {
    let attempt = store.record_attempt(exercise_id, student_id, response).await?;

    tracing::info!(
        attempt_id = %attempt.id,
        attempt_number = attempt.attempt_number,
        "Attempt recorded"
    );

    Ok(attempt)
}

/// Scores an attempt once; the enrollment's final score follows.
pub async fn evaluate(
    store: &dyn CourseworkStore,
    attempt_id: Uuid,
    score: f64,
) -> Result<Evaluation, ServiceError> {
    let evaluation = store.evaluate_attempt(attempt_id, score).await.map_err(|e| {
        if let StoreError::AlreadyEvaluated(_) = e {
            tracing::warn!(attempt_id = %attempt_id, "Rejected re-evaluation");
        }
        e
    })?;

    Ok(evaluation)
}
