// src/services/submission.rs

use uuid::Uuid;

use crate::{
    grading::grade_submission,
    models::submission::{AnswerMap, GradingRecord, Submission},
    services::ServiceError,
    store::{CourseworkStore, StoreError},
};

/// Saves a student's answers for a topic as a new submission version.
pub async fn save_answers(
    store: &dyn CourseworkStore,
    topic_id: Uuid,
    student_id: Uuid,
    answers: &AnswerMap,
) -> Result<Submission, ServiceError> {
    store
        .get_topic(topic_id)
        .await?
        .ok_or(StoreError::NotFound("Topic"))?;

    let submission = store.save_answers(topic_id, student_id, answers).await?;

    tracing::debug!(
        submission_id = %submission.id,
        version = submission.version,
        "Answers saved"
    );

    Ok(submission)
}

/// Grades the latest saved answers and finalizes the submission.
///
/// * Every question of the topic must have a non-empty answer, otherwise the
///   pass aborts and nothing is written.
/// * The result replaces whatever an earlier pass stored.
pub async fn submit(
    store: &dyn CourseworkStore,
    topic_id: Uuid,
    student_id: Uuid,
) -> Result<GradingRecord, ServiceError> {
    store
        .get_topic(topic_id)
        .await?
        .ok_or(StoreError::NotFound("Topic"))?;

    let submission = store
        .get_submission(topic_id, student_id)
        .await?
        .ok_or(StoreError::NotFound("Submission"))?;

    let questions = store.list_questions(topic_id).await?;

    let result = grade_submission(&questions, &submission.answers.0).map_err(|e| {
        tracing::warn!(submission_id = %submission.id, "Grading aborted: {}", e);
        e
    })?;

    let record = store
        .finalize_submission(submission.id, submission.version, result)
        .await?;

    tracing::info!(
        submission_id = %record.submission_id,
        correct = record.questions_correct,
        incorrect = record.questions_incorrect,
        "Submission graded"
    );

    Ok(record)
}

/// Latest grading result for a submission.
pub async fn latest_result(
    store: &dyn CourseworkStore,
    submission_id: Uuid,
) -> Result<GradingRecord, ServiceError> {
    let record = store
        .get_grading_result(submission_id)
        .await?
        .ok_or(StoreError::NotFound("Grading result"))?;

    Ok(record)
}
