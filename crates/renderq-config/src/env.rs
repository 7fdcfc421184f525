//! Environment variable overrides.
//!
//! | Variable | Effect |
//! |---|---|
//! | `DATABASE_URL` | PostgreSQL connection string, when the postgres backend is in use |
//! | `RENDERQ_STORAGE` | `postgres` or `memory` |
//! | `PORT` | Port of the listen address |
//! | `TOTAL_JOBS` | Number of jobs created on first start |
//! | `RENDERQ_LOG_FORMAT` | `pretty` or `json` |

use crate::tracker::{DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS, parse_log_format};
use crate::{ConfigError, ConfigResult, StorageConfig, TrackerConfig};

/// Apply overrides on top of a parsed configuration.
///
/// `lookup` resolves a variable name to its value; pass
/// `|key| std::env::var(key).ok()` for the process environment.
pub fn apply_env_overrides<F>(mut config: TrackerConfig, lookup: F) -> ConfigResult<TrackerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(backend) = lookup("RENDERQ_STORAGE") {
        config.storage = match backend.trim() {
            "memory" => StorageConfig::Memory,
            "postgres" => match config.storage {
                pg @ StorageConfig::Postgres { .. } => pg,
                StorageConfig::Memory => StorageConfig::Postgres {
                    url: DEFAULT_DATABASE_URL.to_string(),
                    max_connections: DEFAULT_MAX_CONNECTIONS,
                },
            },
            other => {
                return Err(ConfigError::invalid(
                    "RENDERQ_STORAGE",
                    format!("unknown storage backend: {}", other),
                ));
            }
        };
    }

    if let Some(database_url) = lookup("DATABASE_URL") {
        if let StorageConfig::Postgres { url, .. } = &mut config.storage {
            *url = database_url;
        }
    }

    if let Some(port) = lookup("PORT") {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid("PORT", format!("not a port number: {}", port)))?;
        config.listen.set_port(port);
    }

    if let Some(total) = lookup("TOTAL_JOBS") {
        config.total_jobs = total.trim().parse().map_err(|_| {
            ConfigError::invalid("TOTAL_JOBS", format!("not an integer: {}", total))
        })?;
    }

    if let Some(format) = lookup("RENDERQ_LOG_FORMAT") {
        config.log_format = parse_log_format(format.trim())?;
    }

    config.validate()?;
    Ok(config)
}
