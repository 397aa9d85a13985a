// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::grading::progress::{CurrentPosition, ProgressSummary};

/// Represents the 'attempts' table.
/// Never mutated after creation except to attach an evaluation score.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub student_id: Uuid,
    pub attempt_number: i32,
    pub response: String,
    pub evaluated_score: Option<f64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub evaluated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'enrollments' table. Both scores are derived.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub case_study_id: Uuid,
    pub student_id: Uuid,
    pub final_score: f64,
    pub completion_percentage: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub attempt: Attempt,
    pub final_score: f64,
}

/// Progress of one student within a case study, as shown to instructors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub student_id: Uuid,
    pub case_study_id: Uuid,
    pub total_exercises: i64,
    pub attempted_exercises: i64,
    pub completion_percentage: i64,
    pub current_position: Option<CurrentPosition>,
    pub final_score: f64,
}

impl StudentProgress {
    pub fn new(enrollment: &Enrollment, summary: ProgressSummary) -> Self {
        Self {
            student_id: enrollment.student_id,
            case_study_id: enrollment.case_study_id,
            total_exercises: summary.total_exercises,
            attempted_exercises: summary.attempted_exercises,
            completion_percentage: summary.completion_percentage,
            current_position: summary.current_position,
            final_score: enrollment.final_score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPage {
    pub items: Vec<StudentProgress>,
    pub next_cursor: Option<Uuid>,
}

/// Query params for the instructor progress listing.
#[derive(Debug, Deserialize)]
pub struct ProgressListParams {
    pub limit: Option<i64>,
    pub cursor: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub student_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptRequest {
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 10000))]
    pub response: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateAttemptRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub evaluated_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_range() {
        assert!(EvaluateAttemptRequest { evaluated_score: 4.5 }.validate().is_ok());
        assert!(EvaluateAttemptRequest { evaluated_score: -1.0 }.validate().is_err());
        assert!(EvaluateAttemptRequest { evaluated_score: 100.5 }.validate().is_err());
    }
}
