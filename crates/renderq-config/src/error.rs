//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    Parse(#[from] kdl::KdlError),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
