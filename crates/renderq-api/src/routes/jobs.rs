//! Job endpoints used by workers and the dashboard.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use renderq_core::{Job, JobId, JobStatus};
use renderq_db::StatusCounts;
use renderq_tracker::MAX_PAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

const DEFAULT_PAGE_SIZE: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/reset-flagged", post(reset_flagged))
        .route("/jobs/reset-all", post(reset_all))
        .route("/stats", get(get_stats))
        .route("/next-job", post(next_job))
        .route("/job/{id}", get(get_job))
        .route("/job/{id}/status", post(update_status))
        .route("/job/{id}/claim", post(claim_job))
        .route("/job/{id}/flag", post(flag_job))
        .route("/job/{id}/unflag", post(unflag_job))
        .route("/job/{id}/star", post(toggle_star))
        .route("/job/{id}/reset", post(reset_job))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds since the job was claimed, while it is working.
    pub elapsed_time: Option<i64>,
    pub worker_url: Option<String>,
    pub starred: bool,
}

impl JobResponse {
    fn at(job: Job, now: DateTime<Utc>) -> Self {
        Self {
            elapsed_time: job.elapsed_secs(now),
            id: job.id,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
            start_time: job.start_time,
            worker_url: job.worker_url,
            starred: job.starred,
        }
    }
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self::at(job, Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(0, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let page = state.tracker.list_filtered(offset, limit, status).await?;
    let now = Utc::now();
    Ok(Json(JobsResponse {
        jobs: page
            .jobs
            .into_iter()
            .map(|job| JobResponse::at(job, now))
            .collect(),
        total: page.total,
        page: if limit > 0 { offset / limit } else { 0 },
        limit,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: StatusCounts,
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.tracker.stats().await?;
    Ok(Json(StatsResponse { stats }))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker.get(JobId::new(id)).await?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker.set_status(JobId::new(id), &req.status).await?;
    Ok(Json(job.into()))
}

/// Body of the claim endpoints. Workers may omit it entirely.
#[derive(Debug, Default, Deserialize)]
struct ClaimRequest {
    worker_url: Option<String>,
}

impl ClaimRequest {
    /// An empty body means an anonymous claim, whatever the content type says.
    fn from_body(body: &Bytes) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid claim body: {}", e)))
    }
}

async fn next_job(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JobResponse>, ApiError> {
    let req = ClaimRequest::from_body(&body)?;
    let job = state.tracker.claim_next(req.worker_url.as_deref()).await?;
    Ok(Json(job.into()))
}

async fn claim_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<JobResponse>, ApiError> {
    let req = ClaimRequest::from_body(&body)?;
    let job = state
        .tracker
        .claim(JobId::new(id), req.worker_url.as_deref())
        .await?;
    Ok(Json(job.into()))
}

async fn flag_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker.flag(JobId::new(id)).await?;
    Ok(Json(job.into()))
}

async fn unflag_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker.unflag(JobId::new(id)).await?;
    Ok(Json(job.into()))
}

async fn toggle_star(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker.toggle_star(JobId::new(id)).await?;
    Ok(Json(job.into()))
}

async fn reset_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker.reset(JobId::new(id)).await?;
    Ok(Json(job.into()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
    pub reset_count: u64,
}

async fn reset_flagged(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let reset_count = state.tracker.reset_all_flagged().await?;
    Ok(Json(ResetResponse {
        message: format!("Reset {} flagged jobs", reset_count),
        reset_count,
    }))
}

async fn reset_all(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let reset_count = state.tracker.reset_all().await?;
    Ok(Json(ResetResponse {
        message: format!("Reset {} jobs to inactive", reset_count),
        reset_count,
    }))
}
