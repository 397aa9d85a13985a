//! Operations that fetch records, run the grading computations and persist
//! the results.

pub mod progress;
pub mod submission;

use thiserror::Error;

use crate::{grading::GradingError, store::StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
