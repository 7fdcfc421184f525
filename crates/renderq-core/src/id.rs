//! Job identifiers.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Identifier of a job. Ids form the dense range `[1, N]` fixed at initialization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct JobId(i64);

impl JobId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying integer.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}
