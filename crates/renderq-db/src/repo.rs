//! Repository traits and implementations.

pub mod job;
pub mod memory;
pub mod postgres;

pub use job::{JobPage, JobRepo, StatusCounts, empty_counts};
pub use memory::MemoryJobRepo;
pub use postgres::PgJobRepo;
