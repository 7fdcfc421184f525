//! Job store for the RenderQ tracker.
//!
//! [`JobRepo`] is the storage seam. [`PgJobRepo`] keeps the job table in
//! PostgreSQL and relies on row locks for claim exclusivity; [`MemoryJobRepo`]
//! keeps it behind a single lock and is meant for development and tests.

pub mod error;
pub mod repo;

pub use error::{DbError, DbResult};
pub use repo::*;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Open a PostgreSQL pool with at most `max_connections` connections.
pub async fn create_pool(database_url: &str, max_connections: u32) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Apply the embedded `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await?;
    info!(count = migrator.iter().count(), "Job store migrations applied");
    Ok(())
}
