//! Error types for RenderQ.

use thiserror::Error;

use crate::JobId;

#[derive(Debug, Error)]
pub enum Error {
    /// The queue has no inactive job left. Callers should back off and poll again.
    #[error("no jobs available")]
    NoJobsAvailable,

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("job {0} is already claimed")]
    AlreadyClaimed(JobId),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
