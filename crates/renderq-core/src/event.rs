//! Change events published after every committed job mutation.
//!
//! Events are hints: they tell observers that something changed, and
//! observers are expected to re-read the jobs they care about.

use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A single job changed status.
    #[serde(rename = "job_update")]
    JobUpdated { job_id: JobId, status: JobStatus },
    StarToggled { job_id: JobId, starred: bool },
    /// A bulk reset moved `count` jobs back to `inactive`.
    JobsReset { count: u64 },
}

impl JobEvent {
    /// The job this event concerns, if it concerns exactly one.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::JobUpdated { job_id, .. } | JobEvent::StarToggled { job_id, .. } => {
                Some(*job_id)
            }
            JobEvent::JobsReset { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_update_wire_format() {
        let event = JobEvent::JobUpdated {
            job_id: JobId::new(12),
            status: JobStatus::Working,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "job_update", "job_id": 12, "status": "working"})
        );
    }

    #[test]
    fn test_bulk_event_has_no_single_job() {
        let event = JobEvent::JobsReset { count: 3 };
        assert_eq!(event.job_id(), None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "jobs_reset");
        assert_eq!(json["count"], 3);
    }
}
