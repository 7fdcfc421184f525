//! The job record and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed.
    Inactive,
    /// Claimed by a worker and rendering.
    Working,
    /// The worker reported success.
    Complete,
    /// The rendered output has been retrieved downstream.
    Done,
    /// The worker reported failure.
    Error,
    /// Marked by an operator for re-rendering.
    Flagged,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Inactive,
        JobStatus::Working,
        JobStatus::Complete,
        JobStatus::Done,
        JobStatus::Error,
        JobStatus::Flagged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Inactive => "inactive",
            JobStatus::Working => "working",
            JobStatus::Complete => "complete",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Flagged => "flagged",
        }
    }

    /// Whether a caller may move a job into this status through a plain status update.
    ///
    /// `working` is only reachable through a claim, and `inactive` only through a reset.
    pub fn is_directly_settable(&self) -> bool {
        !matches!(self, JobStatus::Inactive | JobStatus::Working)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inactive" => Ok(JobStatus::Inactive),
            "working" => Ok(JobStatus::Working),
            "complete" => Ok(JobStatus::Complete),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            "flagged" => Ok(JobStatus::Flagged),
            _ => Err(format!("unknown job status: {}", s)),
        }
    }
}

/// A render job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Worker that claimed the job. Only present while `working`.
    pub worker_url: Option<String>,
    /// When the job was claimed. Only present while `working`.
    pub start_time: Option<DateTime<Utc>>,
    /// User bookmark, untouched by status transitions.
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A freshly initialized job.
    pub fn new(id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Inactive,
            worker_url: None,
            start_time: None,
            starred: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seconds the job has been rendering, if it is currently `working`.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status != JobStatus::Working {
            return None;
        }
        self.start_time
            .map(|start| (now - start).num_seconds().max(0))
    }

    pub fn is_claimed(&self) -> bool {
        self.status == JobStatus::Working
    }
}
