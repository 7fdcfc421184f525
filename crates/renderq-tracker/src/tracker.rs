//! Claim engine and status transition authority.

use renderq_core::{Error, Job, JobEvent, JobId, JobStatus, Result};
use renderq_db::{JobPage, JobRepo, StatusCounts};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::ChangeNotifier;

/// Largest page `list` will return.
pub const MAX_PAGE_SIZE: i64 = 10_000;

/// Entry point for every job mutation.
///
/// Claims are the only way into `working` and resets the only way back to
/// `inactive`; every other status is accepted as given. Each committed
/// change is published on the [`ChangeNotifier`].
pub struct JobTracker {
    repo: Arc<dyn JobRepo>,
    notifier: ChangeNotifier,
}

impl JobTracker {
    pub fn new(repo: Arc<dyn JobRepo>, notifier: ChangeNotifier) -> Self {
        Self { repo, notifier }
    }

    /// Create `total_jobs` inactive jobs unless the store already has jobs.
    pub async fn initialize(&self, total_jobs: i64) -> Result<u64> {
        let created = self.repo.initialize(total_jobs).await?;
        if created > 0 {
            info!(created, "Populated job store");
        } else {
            debug!("Job store already populated");
        }
        Ok(created)
    }

    pub async fn get(&self, id: JobId) -> Result<Job> {
        check_id(id)?;
        Ok(self.repo.get(id).await?)
    }

    /// Claim the lowest-id inactive job for `worker_url`.
    ///
    /// Fails with [`Error::NoJobsAvailable`] when the queue is drained.
    pub async fn claim_next(&self, worker_url: Option<&str>) -> Result<Job> {
        let job = self
            .repo
            .claim_next(worker_url)
            .await?
            .ok_or(Error::NoJobsAvailable)?;

        info!(job_id = %job.id, worker = ?worker_url, "Claimed job");
        self.publish_status(&job);
        Ok(job)
    }

    /// Claim a specific job. Fails with [`Error::AlreadyClaimed`] unless it is inactive.
    pub async fn claim(&self, id: JobId, worker_url: Option<&str>) -> Result<Job> {
        check_id(id)?;
        let job = self
            .repo
            .claim(id, worker_url)
            .await?
            .ok_or(Error::AlreadyClaimed(id))?;

        info!(job_id = %job.id, worker = ?worker_url, "Claimed job by id");
        self.publish_status(&job);
        Ok(job)
    }

    /// Set a status given by name, as supplied by API callers.
    pub async fn set_status(&self, id: JobId, status: &str) -> Result<Job> {
        let status = status.parse::<JobStatus>().map_err(Error::InvalidTransition)?;
        self.transition(id, status).await
    }

    /// Apply a status change.
    ///
    /// `inactive` is carried out as a [`reset`](Self::reset); `working` is
    /// rejected because only a claim may start a job.
    pub async fn transition(&self, id: JobId, status: JobStatus) -> Result<Job> {
        if status == JobStatus::Inactive {
            return self.reset(id).await;
        }
        if !status.is_directly_settable() {
            return Err(Error::InvalidTransition(format!(
                "job {} can only start {} by being claimed",
                id, status
            )));
        }

        check_id(id)?;
        let job = self.repo.set_status(id, status).await?;
        info!(job_id = %id, status = %status, "Job status updated");
        self.publish_status(&job);
        Ok(job)
    }

    /// Worker reported success.
    pub async fn complete(&self, id: JobId) -> Result<Job> {
        self.transition(id, JobStatus::Complete).await
    }

    /// Worker reported failure.
    pub async fn fail(&self, id: JobId) -> Result<Job> {
        self.transition(id, JobStatus::Error).await
    }

    /// Output retrieved downstream.
    pub async fn mark_done(&self, id: JobId) -> Result<Job> {
        self.transition(id, JobStatus::Done).await
    }

    /// Mark a job for re-rendering.
    pub async fn flag(&self, id: JobId) -> Result<Job> {
        self.transition(id, JobStatus::Flagged).await
    }

    /// Withdraw a flag, returning the job to `done`.
    pub async fn unflag(&self, id: JobId) -> Result<Job> {
        self.transition(id, JobStatus::Done).await
    }

    /// Return a job to `inactive` and clear its worker metadata.
    pub async fn reset(&self, id: JobId) -> Result<Job> {
        check_id(id)?;
        let job = self.repo.reset(id).await?;
        info!(job_id = %id, "Job reset");
        self.publish_status(&job);
        Ok(job)
    }

    /// Reset every job flagged when the sweep starts. Returns how many were reset.
    pub async fn reset_all_flagged(&self) -> Result<u64> {
        let count = self.repo.reset_all_with_status(JobStatus::Flagged).await?;
        info!(count, "Reset flagged jobs");
        self.publish_bulk(count);
        Ok(count)
    }

    /// Reset every job that is not already inactive. Returns how many were reset.
    pub async fn reset_all(&self) -> Result<u64> {
        let count = self.repo.reset_all().await?;
        info!(count, "Reset all jobs");
        self.publish_bulk(count);
        Ok(count)
    }

    pub async fn toggle_star(&self, id: JobId) -> Result<Job> {
        check_id(id)?;
        let job = self.repo.toggle_star(id).await?;
        self.notifier.publish(JobEvent::StarToggled {
            job_id: job.id,
            starred: job.starred,
        });
        Ok(job)
    }

    /// A page of jobs in ascending id order, with the total job count.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<JobPage> {
        self.list_filtered(offset, limit, None).await
    }

    pub async fn list_filtered(
        &self,
        offset: i64,
        limit: i64,
        status: Option<JobStatus>,
    ) -> Result<JobPage> {
        let offset = offset.max(0);
        let limit = limit.clamp(0, MAX_PAGE_SIZE);
        Ok(self.repo.list(offset, limit, status).await?)
    }

    pub async fn stats(&self) -> Result<StatusCounts> {
        Ok(self.repo.stats().await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.notifier.subscribe()
    }

    fn publish_status(&self, job: &Job) {
        self.notifier.publish(JobEvent::JobUpdated {
            job_id: job.id,
            status: job.status,
        });
    }

    fn publish_bulk(&self, count: u64) {
        if count > 0 {
            self.notifier.publish(JobEvent::JobsReset { count });
        }
    }
}

/// Ids start at 1; anything lower cannot exist.
fn check_id(id: JobId) -> Result<()> {
    if id.get() < 1 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}
