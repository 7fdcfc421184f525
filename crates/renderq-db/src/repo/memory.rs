//! In-memory job repository.
//!
//! Not durable. Every operation runs under a single write (or read) lock
//! acquisition, which makes each one indivisible the same way a single SQL
//! statement is for [`PgJobRepo`](crate::PgJobRepo).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use renderq_core::{Job, JobId, JobStatus};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use crate::repo::job::{JobPage, JobRepo, StatusCounts, empty_counts};
use crate::{DbError, DbResult};

#[derive(Debug, Default)]
struct Table {
    jobs: BTreeMap<JobId, Job>,
    /// Ids of `inactive` jobs, so the claim finds the lowest in O(log n).
    inactive: BTreeSet<JobId>,
}

impl Table {
    fn job_mut(&mut self, id: JobId) -> DbResult<&mut Job> {
        self.jobs.get_mut(&id).ok_or(DbError::NotFound(id))
    }

    /// Apply a status change, keeping the inactive index and worker metadata in step.
    fn transition(&mut self, id: JobId, status: JobStatus) -> DbResult<Job> {
        let job = self.jobs.get_mut(&id).ok_or(DbError::NotFound(id))?;
        settle(job, status, Utc::now());
        let job = job.clone();

        if status == JobStatus::Inactive {
            self.inactive.insert(id);
        } else {
            self.inactive.remove(&id);
        }
        Ok(job)
    }

    fn claim(&mut self, id: JobId, worker_url: Option<&str>) -> Option<Job> {
        if !self.inactive.remove(&id) {
            return None;
        }
        let job = self.jobs.get_mut(&id)?;
        let now = Utc::now();
        job.status = JobStatus::Working;
        job.worker_url = worker_url.map(str::to_string);
        job.start_time = Some(now);
        job.updated_at = now;
        Some(job.clone())
    }

    fn reset_matching(&mut self, matches: impl Fn(JobStatus) -> bool) -> u64 {
        let now = Utc::now();
        let mut count = 0;
        for job in self.jobs.values_mut().filter(|job| matches(job.status)) {
            settle(job, JobStatus::Inactive, now);
            self.inactive.insert(job.id);
            count += 1;
        }
        count
    }
}

/// Move a job to a non-working status, dropping its claim.
fn settle(job: &mut Job, status: JobStatus, now: DateTime<Utc>) {
    job.status = status;
    job.worker_url = None;
    job.start_time = None;
    job.updated_at = now;
}

/// In-memory implementation of JobRepo.
#[derive(Debug, Default)]
pub struct MemoryJobRepo {
    table: RwLock<Table>,
}

impl MemoryJobRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepo for MemoryJobRepo {
    async fn initialize(&self, total: i64) -> DbResult<u64> {
        let mut table = self.table.write().await;
        if !table.jobs.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        for raw in 1..=total {
            let id = JobId::new(raw);
            table.jobs.insert(id, Job::new(id, now));
            table.inactive.insert(id);
        }
        Ok(total.max(0) as u64)
    }

    async fn get(&self, id: JobId) -> DbResult<Job> {
        let table = self.table.read().await;
        table.jobs.get(&id).cloned().ok_or(DbError::NotFound(id))
    }

    async fn claim_next(&self, worker_url: Option<&str>) -> DbResult<Option<Job>> {
        let mut table = self.table.write().await;
        let Some(id) = table.inactive.first().copied() else {
            return Ok(None);
        };
        Ok(table.claim(id, worker_url))
    }

    async fn claim(&self, id: JobId, worker_url: Option<&str>) -> DbResult<Option<Job>> {
        let mut table = self.table.write().await;
        if !table.jobs.contains_key(&id) {
            return Err(DbError::NotFound(id));
        }
        Ok(table.claim(id, worker_url))
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> DbResult<Job> {
        self.table.write().await.transition(id, status)
    }

    async fn reset(&self, id: JobId) -> DbResult<Job> {
        self.set_status(id, JobStatus::Inactive).await
    }

    async fn reset_all_with_status(&self, status: JobStatus) -> DbResult<u64> {
        Ok(self.table.write().await.reset_matching(|s| s == status))
    }

    async fn reset_all(&self) -> DbResult<u64> {
        Ok(self
            .table
            .write()
            .await
            .reset_matching(|s| s != JobStatus::Inactive))
    }

    async fn toggle_star(&self, id: JobId) -> DbResult<Job> {
        let mut table = self.table.write().await;
        let job = table.job_mut(id)?;
        job.starred = !job.starred;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn list(
        &self,
        offset: i64,
        limit: i64,
        status: Option<JobStatus>,
    ) -> DbResult<JobPage> {
        let table = self.table.read().await;
        let matching = table
            .jobs
            .values()
            .filter(|job| status.is_none_or(|s| job.status == s));

        let total = matching.clone().count() as i64;
        let jobs = matching
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(JobPage { jobs, total })
    }

    async fn stats(&self) -> DbResult<StatusCounts> {
        let table = self.table.read().await;
        let mut counts = empty_counts();
        for job in table.jobs.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
