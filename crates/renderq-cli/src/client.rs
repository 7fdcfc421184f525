//! HTTP client for the tracker API.

use renderq_core::{Job, JobId, JobStatus};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid tracker URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("tracker returned {status}: {message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// One page of `GET /jobs`.
#[derive(Debug, Deserialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
struct StatsBody {
    stats: BTreeMap<JobStatus, i64>,
}

#[derive(Debug, Deserialize)]
struct ResetBody {
    reset_count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for a single tracker instance.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    client: reqwest::Client,
    base: Url,
}

impl TrackerClient {
    pub fn new(api_url: &str) -> ClientResult<Self> {
        let mut base = Url::parse(api_url)?;
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(path)?)
    }

    /// Claim the next inactive job. `None` when the queue is drained.
    pub async fn next_job(&self, worker_url: Option<&str>) -> ClientResult<Option<Job>> {
        let response = self
            .client
            .post(self.endpoint("next-job")?)
            .json(&json!({ "worker_url": worker_url }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            let text = response.text().await?;
            if is_drained_queue(&text) {
                return Ok(None);
            }
            return Err(ClientError::Api {
                status: reqwest::StatusCode::NOT_FOUND.as_u16(),
                message: error_message(text),
            });
        }
        Self::parse_response(response).await.map(Some)
    }

    pub async fn get_job(&self, id: JobId) -> ClientResult<Job> {
        let response = self
            .client
            .get(self.endpoint(&format!("job/{}", id))?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn update_status(&self, id: JobId, status: &str) -> ClientResult<Job> {
        let response = self
            .client
            .post(self.endpoint(&format!("job/{}/status", id))?)
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn mark_complete(&self, id: JobId) -> ClientResult<Job> {
        self.update_status(id, JobStatus::Complete.as_str()).await
    }

    pub async fn mark_error(&self, id: JobId) -> ClientResult<Job> {
        self.update_status(id, JobStatus::Error.as_str()).await
    }

    pub async fn mark_done(&self, id: JobId) -> ClientResult<Job> {
        self.update_status(id, JobStatus::Done.as_str()).await
    }

    pub async fn flag(&self, id: JobId) -> ClientResult<Job> {
        self.post_job_action(id, "flag").await
    }

    pub async fn reset(&self, id: JobId) -> ClientResult<Job> {
        self.post_job_action(id, "reset").await
    }

    pub async fn reset_flagged(&self) -> ClientResult<u64> {
        let response = self
            .client
            .post(self.endpoint("jobs/reset-flagged")?)
            .send()
            .await?;
        let body: ResetBody = Self::parse_response(response).await?;
        Ok(body.reset_count)
    }

    pub async fn stats(&self) -> ClientResult<BTreeMap<JobStatus, i64>> {
        let response = self.client.get(self.endpoint("stats")?).send().await?;
        let body: StatsBody = Self::parse_response(response).await?;
        Ok(body.stats)
    }

    pub async fn list(
        &self,
        offset: i64,
        limit: i64,
        status: Option<JobStatus>,
    ) -> ClientResult<JobList> {
        let mut url = self.endpoint("jobs")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("offset", &offset.to_string());
            query.append_pair("limit", &limit.to_string());
            if let Some(status) = status {
                query.append_pair("status", status.as_str());
            }
        }
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    async fn post_job_action(&self, id: JobId, action: &str) -> ClientResult<Job> {
        let response = self
            .client
            .post(self.endpoint(&format!("job/{}/{}", id, action))?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(text),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// The `error` field of a tracker error body, or the raw text for anything else.
fn error_message(text: String) -> String {
    serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text)
}

/// Whether a 404 body is the tracker saying the queue is empty, as opposed
/// to a route that does not exist.
fn is_drained_queue(text: &str) -> bool {
    serde_json::from_str::<ErrorBody>(text)
        .is_ok_and(|body| body.error == renderq_core::Error::NoJobsAvailable.to_string())
}
