// src/models/submission.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

/// Submitted answer keys per question id. Key order within a list is irrelevant.
pub type AnswerMap = BTreeMap<Uuid, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
}

/// Represents the 'submissions' table: one per (topic, student).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub student_id: Uuid,
    pub answers: Json<AnswerMap>,
    pub status: SubmissionStatus,

    /// Incremented on every save.
    pub version: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Snapshot of a question's expected keys, kept for later review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectAnswer {
    pub question_id: Uuid,
    pub expected_keys: Vec<String>,
}

/// Outcome of one grading pass over a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub questions_attempted: i64,
    pub questions_correct: i64,
    pub questions_incorrect: i64,
    pub questions_skipped: i64,
    pub correct_answers: Vec<CorrectAnswer>,
}

/// Represents the 'grading_results' table: the latest result per submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRecord {
    pub submission_id: Uuid,
    pub submission_version: i32,
    pub questions_attempted: i64,
    pub questions_correct: i64,
    pub questions_incorrect: i64,
    pub questions_skipped: i64,
    pub correct_answers: Json<Vec<CorrectAnswer>>,
    pub graded_at: chrono::DateTime<chrono::Utc>,
}

impl GradingRecord {
    pub fn new(submission_id: Uuid, submission_version: i32, result: GradingResult) -> Self {
        Self {
            submission_id,
            submission_version,
            questions_attempted: result.questions_attempted,
            questions_correct: result.questions_correct,
            questions_incorrect: result.questions_incorrect,
            questions_skipped: result.questions_skipped,
            correct_answers: Json(result.correct_answers),
            graded_at: chrono::Utc::now(),
        }
    }
}

/// DTO for saving (a draft of) a student's answers.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveAnswersRequest {
    #[validate(custom(function = validate_answers))]
    pub answers: AnswerMap,
}

fn validate_answers(answers: &AnswerMap) -> Result<(), validator::ValidationError> {
    if answers.len() > 500 {
        return Err(validator::ValidationError::new("too_many_questions"));
    }
    for keys in answers.values() {
        if keys.len() > 50 {
            return Err(validator::ValidationError::new("too_many_answer_keys"));
        }
        if keys.iter().any(|k| k.len() > 200) {
            return Err(validator::ValidationError::new("answer_key_too_long"));
        }
    }
    Ok(())
}
