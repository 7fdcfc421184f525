//! Job tracking for RenderQ.
//!
//! Hands out jobs to workers, applies status transitions and notifies
//! observers of every change. The job store is the only shared state;
//! PostgreSQL `SKIP LOCKED` (or the in-memory store's write lock) makes
//! claims race-free across any number of tracker instances.

pub mod notifier;
pub mod tracker;

pub use notifier::ChangeNotifier;
pub use tracker::{JobTracker, MAX_PAGE_SIZE};
