//! Health check endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the job store answers a query.
async fn ready(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.tracker.stats().await?;
    let total: i64 = stats.values().sum();
    Ok(Json(json!({ "status": "ready", "jobs": total })))
}
