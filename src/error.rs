//! Job-level error types.
//!
//! Row, column and remote-call failures stay `Result<_, String>` and are
//! turned into counters and log lines where they happen. Only the variants
//! below ever leave an engine.

use thiserror::Error;

pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Invalid properties or a schema/mapping combination that cannot run.
    /// Fatal for the whole job.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The failed-partition file could not be written or read.
    #[error("Failed partition log error: {0}")]
    FailureLog(String),

    /// A partition range failed on every attempt.
    #[error("Partition range {range} failed after {attempts} attempt(s): {reason}")]
    RangeExhausted {
        range: String,
        attempts: u32,
        reason: String,
    },
}

impl MigrationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, MigrationError::Config(_))
    }
}
