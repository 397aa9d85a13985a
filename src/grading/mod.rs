//! Grading and progress computation.
//!
//! Everything here is pure: callers fetch records, hand them in, and persist
//! whatever comes back.

pub mod matcher;
pub mod progress;
pub mod score;
pub mod submission;

use thiserror::Error;
use uuid::Uuid;

pub use matcher::{Unanswered, answer_set_matches};
pub use progress::{CurrentPosition, ProgressSummary, aggregate_progress};
pub use score::final_score;
pub use submission::grade_submission;

/// Precondition failures that abort a whole grading pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    #[error("missing answer for question {question_id}")]
    MissingAnswer { question_id: Uuid },

    #[error("no answer keys submitted for question {question_id}")]
    EmptyAnswer { question_id: Uuid },
}
