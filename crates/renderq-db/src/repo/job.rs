//! Job repository.

use async_trait::async_trait;
use renderq_core::{Job, JobId, JobStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::DbResult;

/// Number of jobs per status. Every status is present, zero when no job has it.
pub type StatusCounts = BTreeMap<JobStatus, i64>;

/// One page of jobs ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Number of jobs matching the filter, across all pages.
    pub total: i64,
}

/// Durable job table.
///
/// Every method is a single atomic step against the store: concurrent
/// callers never observe a half-applied mutation, and two concurrent claims
/// never return the same job.
#[async_trait]
pub trait JobRepo: Send + Sync {
    /// Create jobs `1..=total` as `inactive` if the store is empty.
    ///
    /// Returns the number of jobs created; zero when the store was already populated.
    async fn initialize(&self, total: i64) -> DbResult<u64>;

    async fn get(&self, id: JobId) -> DbResult<Job>;

    /// Move the lowest-id `inactive` job to `working`, stamping the worker
    /// and start time. `None` when no job is inactive.
    async fn claim_next(&self, worker_url: Option<&str>) -> DbResult<Option<Job>>;

    /// Move job `id` to `working` if it is currently `inactive`.
    ///
    /// `None` when the job exists but is not inactive.
    async fn claim(&self, id: JobId, worker_url: Option<&str>) -> DbResult<Option<Job>>;

    /// Overwrite the status of a job and clear its worker metadata.
    ///
    /// Callers route `working` through [`claim`](Self::claim) and
    /// `inactive` through [`reset`](Self::reset).
    async fn set_status(&self, id: JobId, status: JobStatus) -> DbResult<Job>;

    /// Move a job back to `inactive`, clearing worker metadata.
    async fn reset(&self, id: JobId) -> DbResult<Job>;

    /// Reset every job currently in `status`, as of the start of the sweep.
    async fn reset_all_with_status(&self, status: JobStatus) -> DbResult<u64>;

    /// Reset every job that is not already `inactive`.
    async fn reset_all(&self) -> DbResult<u64>;

    async fn toggle_star(&self, id: JobId) -> DbResult<Job>;

    /// Jobs ordered by id, optionally restricted to one status.
    async fn list(&self, offset: i64, limit: i64, status: Option<JobStatus>)
    -> DbResult<JobPage>;

    async fn stats(&self) -> DbResult<StatusCounts>;
}

/// A [`StatusCounts`] with every status set to zero.
pub fn empty_counts() -> StatusCounts {
    JobStatus::ALL.into_iter().map(|s| (s, 0)).collect()
}
