//! PostgreSQL job repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use renderq_core::{Job, JobId, JobStatus};
use sqlx::PgPool;

use crate::repo::job::{JobPage, JobRepo, StatusCounts, empty_counts};
use crate::{DbError, DbResult};

/// A job row as stored in the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRecord {
    pub id: i64,
    pub status: String,
    pub worker_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRecord> for Job {
    type Error = DbError;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        let status = record
            .status
            .parse::<JobStatus>()
            .map_err(|e| DbError::Corrupt(format!("job {}: {}", record.id, e)))?;
        Ok(Job {
            id: JobId::new(record.id),
            status,
            worker_url: record.worker_url,
            start_time: record.start_time,
            starred: record.starred,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// PostgreSQL implementation of JobRepo.
pub struct PgJobRepo {
    pool: PgPool,
}

impl PgJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: JobId) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn update_returning(&self, sql: &str, id: JobId, status: JobStatus) -> DbResult<Job> {
        let record = sqlx::query_as::<_, JobRecord>(sql)
            .bind(id.get())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound(id))?;
        record.try_into()
    }
}

#[async_trait]
impl JobRepo for PgJobRepo {
    async fn initialize(&self, total: i64) -> DbResult<u64> {
        let populated: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs)")
            .fetch_one(&self.pool)
            .await?;
        if populated {
            return Ok(0);
        }

        // Two trackers starting against an empty table both get here; the
        // conflict clause makes the slower insert a no-op.
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, status, created_at, updated_at)
            SELECT g, 'inactive', NOW(), NOW()
            FROM generate_series(1::BIGINT, $1::BIGINT) AS g
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(total)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn get(&self, id: JobId) -> DbResult<Job> {
        let record = sqlx::query_as::<_, JobRecord>("SELECT * FROM jobs WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound(id))?;
        record.try_into()
    }

    /// Claim the lowest inactive job.
    /// SKIP LOCKED lets concurrent claimers move past a row another claimer holds.
    async fn claim_next(&self, worker_url: Option<&str>) -> DbResult<Option<Job>> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            UPDATE jobs
            SET status = 'working', worker_url = $1, start_time = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'inactive'
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND status = 'inactive'
            RETURNING *
            "#,
        )
        .bind(worker_url)
        .fetch_optional(&self.pool)
        .await?;
        record.map(Job::try_from).transpose()
    }

    async fn claim(&self, id: JobId, worker_url: Option<&str>) -> DbResult<Option<Job>> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            UPDATE jobs
            SET status = 'working', worker_url = $2, start_time = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'inactive'
            RETURNING *
            "#,
        )
        .bind(id.get())
        .bind(worker_url)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(Some(record.try_into()?)),
            None if self.exists(id).await? => Ok(None),
            None => Err(DbError::NotFound(id)),
        }
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> DbResult<Job> {
        self.update_returning(
            r#"
            UPDATE jobs
            SET status = $2, worker_url = NULL, start_time = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            id,
            status,
        )
        .await
    }

    async fn reset(&self, id: JobId) -> DbResult<Job> {
        self.set_status(id, JobStatus::Inactive).await
    }

    /// One statement, so the sweep covers exactly the rows matching at its start.
    async fn reset_all_with_status(&self, status: JobStatus) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'inactive', worker_url = NULL, start_time = NULL, updated_at = NOW()
            WHERE status = $1
            "#,
        )
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn reset_all(&self) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'inactive', worker_url = NULL, start_time = NULL, updated_at = NOW()
            WHERE status <> 'inactive'
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn toggle_star(&self, id: JobId) -> DbResult<Job> {
        let record = sqlx::query_as::<_, JobRecord>(
            "UPDATE jobs SET starred = NOT starred, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound(id))?;
        record.try_into()
    }

    async fn list(
        &self,
        offset: i64,
        limit: i64,
        status: Option<JobStatus>,
    ) -> DbResult<JobPage> {
        let status = status.map(|s| s.as_str());

        let records = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        let jobs = records
            .into_iter()
            .map(Job::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(JobPage { jobs, total })
    }

    async fn stats(&self) -> DbResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = empty_counts();
        for (status, count) in rows {
            let status = status
                .parse::<JobStatus>()
                .map_err(DbError::Corrupt)?;
            counts.insert(status, count);
        }
        Ok(counts)
    }
}

/// These run against a real PostgreSQL instance named by `DATABASE_URL`.
/// Run with: `cargo test -p renderq-db -- --ignored`
#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn seeded(pool: PgPool, total: i64) -> PgJobRepo {
        let repo = PgJobRepo::new(pool);
        repo.initialize(total).await.unwrap();
        repo
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_initialize_is_idempotent(pool: PgPool) {
        let repo = PgJobRepo::new(pool);
        assert_eq!(repo.initialize(5).await.unwrap(), 5);
        assert_eq!(repo.initialize(5).await.unwrap(), 0);
        assert_eq!(repo.stats().await.unwrap()[&JobStatus::Inactive], 5);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_claim_next_takes_lowest_inactive(pool: PgPool) {
        let repo = seeded(pool, 7).await;
        for id in [1, 2, 4, 6] {
            repo.set_status(JobId::new(id), JobStatus::Done).await.unwrap();
        }

        let job = repo.claim_next(Some("http://w1")).await.unwrap().unwrap();
        assert_eq!(job.id, JobId::new(3));
        assert_eq!(job.status, JobStatus::Working);
        assert_eq!(job.worker_url.as_deref(), Some("http://w1"));
        assert!(job.start_time.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_concurrent_claims_are_distinct(pool: PgPool) {
        let repo = Arc::new(seeded(pool, 20).await);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let worker = format!("http://worker-{}", i);
                    repo.claim_next(Some(&worker)).await
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let job = handle.await.unwrap().unwrap().unwrap();
            assert!(ids.insert(job.id), "job {} claimed twice", job.id);
        }
        assert_eq!(ids.len(), 20);
        assert!(repo.claim_next(None).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_claim_specific_job(pool: PgPool) {
        let repo = seeded(pool, 3).await;
        assert!(repo.claim(JobId::new(2), None).await.unwrap().is_some());
        assert!(repo.claim(JobId::new(2), None).await.unwrap().is_none());
        assert!(matches!(
            repo.claim(JobId::new(9), None).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_reset_all_flagged(pool: PgPool) {
        let repo = seeded(pool, 15).await;
        for id in [2, 9, 14] {
            repo.set_status(JobId::new(id), JobStatus::Flagged).await.unwrap();
        }
        repo.set_status(JobId::new(5), JobStatus::Done).await.unwrap();

        assert_eq!(repo.reset_all_with_status(JobStatus::Flagged).await.unwrap(), 3);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats[&JobStatus::Flagged], 0);
        assert_eq!(stats[&JobStatus::Done], 1);
        assert_eq!(stats[&JobStatus::Inactive], 14);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_reset_clears_worker_and_keeps_star(pool: PgPool) {
        let repo = seeded(pool, 2).await;
        repo.toggle_star(JobId::new(1)).await.unwrap();
        repo.claim_next(Some("http://w")).await.unwrap();

        let job = repo.reset(JobId::new(1)).await.unwrap();
        assert_eq!(job.status, JobStatus::Inactive);
        assert_eq!(job.worker_url, None);
        assert_eq!(job.start_time, None);
        assert!(job.starred);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_list_with_filter(pool: PgPool) {
        let repo = seeded(pool, 5).await;
        repo.set_status(JobId::new(4), JobStatus::Error).await.unwrap();

        let page = repo.list(0, 2, None).await.unwrap();
        let ids: Vec<i64> = page.jobs.iter().map(|j| j.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(page.total, 5);

        let errors = repo.list(0, 10, Some(JobStatus::Error)).await.unwrap();
        assert_eq!(errors.total, 1);
        assert_eq!(errors.jobs[0].id, JobId::new(4));
    }
}
