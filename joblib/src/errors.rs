use std::result;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("job has already stopped")]
    AlreadyStopped,
    #[error("job coordinator is not running")]
    CoordinatorUnavailable,
}

/// Why a job ended without a normal exit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("tool is not installed")]
    ToolNotInstalled,
    #[error("failed to start process: {0}")]
    SpawnFailed(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = result::Result<T, JobError>;
