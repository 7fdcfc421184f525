//! CLI command implementations.

pub mod uploaded;
pub mod work;

use crate::client::TrackerClient;
use anyhow::Result;
use renderq_core::{Job, JobId, JobStatus};
use std::path::Path;

pub async fn next(client: &TrackerClient, worker_url: Option<String>) -> Result<()> {
    match client.next_job(worker_url.as_deref()).await? {
        Some(job) => print_job(&job),
        None => println!("No jobs available"),
    }
    Ok(())
}

pub async fn status(client: &TrackerClient, id: JobId) -> Result<()> {
    let job = client.get_job(id).await?;
    print_job(&job);
    Ok(())
}

pub async fn set_status(client: &TrackerClient, id: JobId, status: JobStatus) -> Result<()> {
    let job = match status {
        JobStatus::Complete => client.mark_complete(id).await?,
        JobStatus::Error => client.mark_error(id).await?,
        JobStatus::Done => client.mark_done(id).await?,
        other => client.update_status(id, other.as_str()).await?,
    };
    print_job(&job);
    Ok(())
}

pub async fn flag(client: &TrackerClient, id: JobId) -> Result<()> {
    let job = client.flag(id).await?;
    print_job(&job);
    Ok(())
}

pub async fn reset(client: &TrackerClient, id: JobId) -> Result<()> {
    let job = client.reset(id).await?;
    print_job(&job);
    Ok(())
}

pub async fn reset_flagged(client: &TrackerClient) -> Result<()> {
    let count = client.reset_flagged().await?;
    println!("Reset {} flagged jobs", count);
    Ok(())
}

pub async fn stats(client: &TrackerClient) -> Result<()> {
    let stats = client.stats().await?;
    let total: i64 = stats.values().sum();
    for (status, count) in &stats {
        println!("{:<10} {:>8}", status, count);
    }
    println!("{:<10} {:>8}", "total", total);
    Ok(())
}

pub async fn list(
    client: &TrackerClient,
    offset: i64,
    limit: i64,
    status: Option<JobStatus>,
) -> Result<()> {
    let page = client.list(offset, limit, status).await?;
    for job in &page.jobs {
        print_job(job);
    }
    println!(
        "Showing {} of {} jobs (offset {})",
        page.jobs.len(),
        page.total,
        offset
    );
    Ok(())
}

pub async fn uploaded(client: &TrackerClient, path: &Path) -> Result<()> {
    let id = uploaded::job_id_from_path(path)?;
    let job = client.mark_complete(id).await?;
    println!("Marked job {} {}", job.id, job.status);
    Ok(())
}

fn print_job(job: &Job) {
    let star = if job.starred { "*" } else { " " };
    let worker = if job.is_claimed() {
        job.worker_url.as_deref().unwrap_or("(anonymous)")
    } else {
        "-"
    };
    println!("{}{:>8}  {:<9} {}", star, job.id, job.status, worker);
}
