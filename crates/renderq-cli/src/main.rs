//! RenderQ CLI tool.

use clap::{Parser, Subcommand};
use renderq_core::{JobId, JobStatus};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;

use client::TrackerClient;

#[derive(Parser)]
#[command(name = "renderq")]
#[command(about = "RenderQ render job tracker CLI", long_about = None)]
struct Cli {
    /// Tracker server URL
    #[arg(long, env = "RENDERQ_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim the next inactive job
    Next {
        /// URL identifying this worker
        #[arg(long, env = "RENDERQ_WORKER_URL")]
        worker_url: Option<String>,
    },
    /// Show a job
    Status {
        id: JobId,
    },
    /// Mark a job complete
    Complete {
        id: JobId,
    },
    /// Mark a job as failed
    Error {
        id: JobId,
    },
    /// Mark a job's output as retrieved
    Done {
        id: JobId,
    },
    /// Flag a job for re-rendering
    Flag {
        id: JobId,
    },
    /// Return a job to the queue
    Reset {
        id: JobId,
    },
    /// Return every flagged job to the queue
    ResetFlagged,
    /// Show job counts per status
    Stats,
    /// List jobs
    List {
        #[arg(long, default_value = "0")]
        offset: i64,
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Only show jobs with this status
        #[arg(long)]
        status: Option<JobStatus>,
    },
    /// Mark the job a rendered file belongs to as complete (e.g. 123.png)
    Uploaded {
        file: PathBuf,
    },
    /// Claim and render jobs until stopped
    Work {
        /// Shell command to run per job; {id} is replaced with the job id
        #[arg(long)]
        command: String,
        /// URL identifying this worker
        #[arg(long, env = "RENDERQ_WORKER_URL")]
        worker_url: Option<String>,
        /// Seconds to wait when the queue is empty
        #[arg(long, default_value = "1")]
        poll_interval: u64,
        /// Exit once the queue is drained
        #[arg(long)]
        exit_when_empty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = TrackerClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Next { worker_url } => commands::next(&client, worker_url).await?,
        Commands::Status { id } => commands::status(&client, id).await?,
        Commands::Complete { id } => {
            commands::set_status(&client, id, JobStatus::Complete).await?
        }
        Commands::Error { id } => commands::set_status(&client, id, JobStatus::Error).await?,
        Commands::Done { id } => commands::set_status(&client, id, JobStatus::Done).await?,
        Commands::Flag { id } => commands::flag(&client, id).await?,
        Commands::Reset { id } => commands::reset(&client, id).await?,
        Commands::ResetFlagged => commands::reset_flagged(&client).await?,
        Commands::Stats => commands::stats(&client).await?,
        Commands::List {
            offset,
            limit,
            status,
        } => commands::list(&client, offset, limit, status).await?,
        Commands::Uploaded { file } => commands::uploaded(&client, &file).await?,
        Commands::Work {
            command,
            worker_url,
            poll_interval,
            exit_when_empty,
        } => {
            let opts = commands::work::WorkOptions {
                command,
                worker_url,
                poll_interval: Duration::from_secs(poll_interval),
                exit_when_empty,
            };
            commands::work::run(&client, opts).await?
        }
    }

    Ok(())
}
