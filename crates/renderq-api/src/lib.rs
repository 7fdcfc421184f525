//! HTTP and WebSocket server for the RenderQ tracker.
//!
//! Workers claim jobs and report results over the REST API; dashboards
//! subscribe to change events on `/ws` and re-fetch what changed.

pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

pub use state::AppState;
