//! Application state.

use renderq_config::{StorageConfig, TrackerConfig};
use renderq_db::{JobRepo, MemoryJobRepo, PgJobRepo, create_pool, run_migrations};
use renderq_tracker::{ChangeNotifier, JobTracker};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<JobTracker>,
}

impl AppState {
    pub fn new(tracker: Arc<JobTracker>) -> Self {
        Self { tracker }
    }

    /// Connect the configured store, run migrations and seed the job table.
    pub async fn from_config(config: &TrackerConfig) -> anyhow::Result<Self> {
        let repo: Arc<dyn JobRepo> = match &config.storage {
            StorageConfig::Postgres {
                url,
                max_connections,
            } => {
                info!("Connecting to database...");
                let pool = create_pool(url, *max_connections).await?;
                run_migrations(&pool).await?;
                info!("Database connected");
                Arc::new(PgJobRepo::new(pool))
            }
            StorageConfig::Memory => {
                warn!("Using in-memory job store; job state is lost on restart");
                Arc::new(MemoryJobRepo::new())
            }
        };

        let tracker = JobTracker::new(repo, ChangeNotifier::new(config.event_capacity));
        tracker.initialize(config.total_jobs).await?;

        Ok(Self::new(Arc::new(tracker)))
    }
}
