//! API routes.

pub mod health;
pub mod jobs;

use crate::AppState;
use crate::ws::ws_handler;
use axum::Router;
use axum::routing::get;

/// Build the main API router.
///
/// Paths are kept at the root so existing worker integrations keep working.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(jobs::router())
        .route("/ws", get(ws_handler))
        .merge(health::router())
        .with_state(state)
}
