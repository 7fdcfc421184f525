//! Configuration for the RenderQ tracker.
//!
//! This crate handles:
//! - Parsing the tracker configuration file (renderq.kdl)
//! - Environment variable overrides

pub mod env;
pub mod error;
pub mod tracker;

pub use env::apply_env_overrides;
pub use error::{ConfigError, ConfigResult};
pub use tracker::{
    LogFormat, MAX_EVENT_CAPACITY, StorageConfig, TrackerConfig, parse_tracker_config,
};

use std::path::Path;

/// Load the tracker configuration.
///
/// Reads `path` when it exists (defaults otherwise), then applies
/// overrides from the process environment.
pub fn load(path: &Path) -> ConfigResult<TrackerConfig> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        parse_tracker_config(&content)?
    } else {
        TrackerConfig::default()
    };
    apply_env_overrides(config, |key| std::env::var(key).ok())
}
