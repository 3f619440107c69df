//! Shared error types for the services crate.
//!
//! Each service keeps not-found distinct from validation failures so the
//! caller can present different user-facing messages.

use thiserror::Error;

use planner_core::model::{GoalError, StudySessionError, SubjectError};
use storage::repository::StorageError;

/// Errors emitted by `ProgressService`.
///
/// Missing session data is never an error; sums degrade to zero.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RecoveryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecoveryError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid or expired recovery code")]
    InvalidCode,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `GoalService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GoalServiceError {
    #[error("goal not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Goal(#[from] GoalError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("session not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("subject not found")]
    SubjectNotFound,
    #[error("sessions cannot be dated in the future")]
    FutureDate,
    #[error(transparent)]
    Session(#[from] StudySessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SubjectService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubjectServiceError {
    #[error("subject not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
