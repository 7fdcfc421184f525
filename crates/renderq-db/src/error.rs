//! Database error types.

use renderq_core::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<DbError> for renderq_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(id) => renderq_core::Error::NotFound(id),
            _ => renderq_core::Error::StoreUnavailable(err.to_string()),
        }
    }
}
