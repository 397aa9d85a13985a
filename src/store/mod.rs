//! Data access behind a trait, so handlers and services never reach for a
//! shared client directly.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    attempt::{Attempt, Enrollment, Evaluation},
    case_study::{CaseStudy, Exercise, Module, ModuleOutline},
    submission::{AnswerMap, GradingRecord, GradingResult, Submission},
    topic::{Question, Topic},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The named record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("attempt {0} has already been evaluated")]
    AlreadyEvaluated(Uuid),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle injected into handlers and services.
pub type DynStore = Arc<dyn CourseworkStore>;

#[async_trait]
pub trait CourseworkStore: Send + Sync {
    // Topics and questions.
    async fn create_topic(&self, title: &str) -> StoreResult<Topic>;
    async fn get_topic(&self, topic_id: Uuid) -> StoreResult<Option<Topic>>;
    async fn create_question(
        &self,
        topic_id: Uuid,
        content: &str,
        answer_keys: &[String],
        order_number: i32,
    ) -> StoreResult<Question>;
    /// Questions of a topic, ascending by `order_number`.
    async fn list_questions(&self, topic_id: Uuid) -> StoreResult<Vec<Question>>;

    // Submissions.
    async fn get_submission(&self, topic_id: Uuid, student_id: Uuid) -> StoreResult<Option<Submission>>;
    /// Creates the submission on first save, otherwise replaces its answers
    /// and bumps its version. Either way the status becomes `in_progress`.
    async fn save_answers(
        &self,
        topic_id: Uuid,
        student_id: Uuid,
        answers: &AnswerMap,
    ) -> StoreResult<Submission>;
    /// Stores `result` as the only grading result of the submission and marks
    /// it submitted. Fails with `Conflict` if the submission moved past
    /// `version` in the meantime.
    async fn finalize_submission(
        &self,
        submission_id: Uuid,
        version: i32,
        result: GradingResult,
    ) -> StoreResult<GradingRecord>;
    async fn get_grading_result(&self, submission_id: Uuid) -> StoreResult<Option<GradingRecord>>;

    // Case studies.
    async fn create_case_study(&self, title: &str) -> StoreResult<CaseStudy>;
    async fn get_case_study(&self, case_study_id: Uuid) -> StoreResult<Option<CaseStudy>>;
    async fn create_module(&self, case_study_id: Uuid, title: &str, order_number: i32) -> StoreResult<Module>;
    async fn get_module(&self, module_id: Uuid) -> StoreResult<Option<Module>>;
    async fn create_exercise(
        &self,
        module_id: Uuid,
        title: &str,
        prompt: &str,
        order_number: i32,
    ) -> StoreResult<Exercise>;
    async fn get_exercise(&self, exercise_id: Uuid) -> StoreResult<Option<Exercise>>;
    async fn list_outline(&self, case_study_id: Uuid) -> StoreResult<Vec<ModuleOutline>>;

    // Enrollments and attempts.
    async fn enroll(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Enrollment>;
    async fn get_enrollment(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Option<Enrollment>>;
    /// Keyset page ordered by enrollment id, strictly after `after`.
    async fn list_enrollments(
        &self,
        case_study_id: Uuid,
        after: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<Enrollment>>;
    /// Numbers the attempt after the student's previous ones on the exercise
    /// and refreshes the enrollment's completion percentage, atomically.
    /// Fails with `NotFound("Enrollment")` when the student is not enrolled.
    async fn record_attempt(&self, exercise_id: Uuid, student_id: Uuid, response: &str) -> StoreResult<Attempt>;
    /// All attempts of a student on exercises of the case study.
    async fn list_attempts(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Vec<Attempt>>;
    /// Attaches a score to an unevaluated attempt and recomputes the
    /// enrollment's final score, atomically. Nothing is written on rejection.
    async fn evaluate_attempt(&self, attempt_id: Uuid, score: f64) -> StoreResult<Evaluation>;
}
