//! Core domain types for the RenderQ render job tracker.
//!
//! This crate contains:
//! - Job identifiers
//! - The job record and its status state machine
//! - Change events published to real-time observers
//! - The error taxonomy shared by every layer

pub mod error;
pub mod event;
pub mod id;
pub mod job;

pub use error::{Error, Result};
pub use event::JobEvent;
pub use id::JobId;
pub use job::{Job, JobStatus};
