//! Row-level reconciliation and migration between two schema-compatible
//! partitioned tables ("origin" and "target").
//!
//! A [`job::MigrationJob`] is built once from [`properties::MigrationProperties`]
//! and two [`statement::TableSession`]s, then driven with partition ranges
//! (diff, range copy) or batches of serialized primary keys (copy by key).

// Core modules
pub mod error;
pub mod properties;
pub mod table_types;

// Row model and per-job features
pub mod data;
pub mod feature;

// Reads, writes and the in-memory session
pub mod memory_table;
pub mod statement;

// Engines
pub mod job;

#[cfg(test)]
mod test_support;

pub use error::{MigrationError, MigrationResult};
pub use job::{JobSummary, MigrationJob, WorkUnit};
pub use memory_table::MemoryTable;
pub use properties::{JobKind, MigrationProperties};
