//! Job layer: throttling, counters, the failed-range log, the shared worker
//! and the three strategies (copy by key, copy by range, diff).

pub mod context;
pub mod copy_pk;
pub mod copy_range;
pub mod counters;
pub mod diff;
pub mod failure_log;
pub mod rate_limiter;
pub mod runner;
pub mod worker;

pub use context::LogContext;
pub use copy_pk::CopyPkJob;
pub use copy_range::CopyRangeJob;
pub use counters::{AttemptCounters, CounterSnapshot, CounterType, JobCounter};
pub use diff::{DiffJob, MismatchEntry};
pub use failure_log::FailedPartitionLog;
pub use rate_limiter::{RateLimiter, RateLimiters};
pub use runner::{JobSummary, MigrationJob};
pub use worker::{JobWorker, UnitProcessor, WorkUnit};
