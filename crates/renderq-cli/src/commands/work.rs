//! Worker loop: claim a job, render it with a shell command, report the result.

use crate::client::{ClientError, TrackerClient};
use anyhow::Result;
use renderq_core::JobId;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{info, warn};

/// Placeholder replaced with the claimed job id.
pub const ID_PLACEHOLDER: &str = "{id}";

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct WorkOptions {
    pub command: String,
    pub worker_url: Option<String>,
    pub poll_interval: Duration,
    /// Stop when the queue is drained instead of polling.
    pub exit_when_empty: bool,
}

pub async fn run(client: &TrackerClient, opts: WorkOptions) -> Result<()> {
    info!(command = %opts.command, "Starting worker");

    let mut rendered = 0u64;
    loop {
        let claimed = tokio::select! {
            result = client.next_job(opts.worker_url.as_deref()) => result,
            _ = tokio::signal::ctrl_c() => break,
        };

        match claimed {
            Ok(Some(job)) => {
                info!(job_id = %job.id, "Claimed job");
                let succeeded = render(&opts.command, job.id).await;
                let report = if succeeded {
                    client.mark_complete(job.id).await
                } else {
                    client.mark_error(job.id).await
                };
                match report {
                    Ok(job) => info!(job_id = %job.id, status = %job.status, "Reported job"),
                    Err(e) => warn!(job_id = %job.id, error = %e, "Failed to report job status"),
                }
                rendered += 1;
            }
            Ok(None) if opts.exit_when_empty => {
                info!("No jobs left");
                break;
            }
            Ok(None) => sleep(opts.poll_interval).await,
            // The claim route itself is missing; polling will never succeed.
            Err(e @ ClientError::Api { status: 404, .. }) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Failed to claim job");
                sleep(ERROR_BACKOFF).await;
            }
        }
    }

    info!(rendered, "Worker stopped");
    Ok(())
}

/// Run the render command for one job. Returns whether it exited successfully.
async fn render(template: &str, id: JobId) -> bool {
    let command = substitute_id(template, id);
    match Command::new("sh").arg("-c").arg(&command).status().await {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!(job_id = %id, %status, "Render command failed");
            false
        }
        Err(e) => {
            warn!(job_id = %id, error = %e, "Failed to spawn render command");
            false
        }
    }
}

pub fn substitute_id(template: &str, id: JobId) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_id_replaces_every_placeholder() {
        assert_eq!(
            substitute_id("render --frame {id} --out frames/{id}.png", JobId::new(42)),
            "render --frame 42 --out frames/42.png"
        );
    }

    #[test]
    fn test_substitute_id_without_placeholder() {
        assert_eq!(substitute_id("render-next", JobId::new(3)), "render-next");
    }

    #[tokio::test]
    async fn test_render_reports_exit_status() {
        assert!(render("test {id} -eq 7", JobId::new(7)).await);
        assert!(!render("test {id} -eq 7", JobId::new(8)).await);
    }
}
