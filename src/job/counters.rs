// =====================================================
// PROGRESS COUNTERS
// Per-attempt accumulation merged into job-wide atomic totals
// =====================================================

use crate::job::context::LogContext;
use crate::properties::JobKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

const COUNTER_TYPE_COUNT: usize = 8;
const FINAL_BANNER: &str =
    "################################################################################################";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterType {
    Read,
    Valid,
    Mismatch,
    CorrectedMismatch,
    Missing,
    CorrectedMissing,
    Skipped,
    Written,
}

impl CounterType {
    pub const ALL: [CounterType; COUNTER_TYPE_COUNT] = [
        CounterType::Read,
        CounterType::Valid,
        CounterType::Mismatch,
        CounterType::CorrectedMismatch,
        CounterType::Missing,
        CounterType::CorrectedMissing,
        CounterType::Skipped,
        CounterType::Written,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            CounterType::Read => "Read",
            CounterType::Valid => "Valid",
            CounterType::Mismatch => "Mismatch",
            CounterType::CorrectedMismatch => "Corrected Mismatch",
            CounterType::Missing => "Missing",
            CounterType::CorrectedMissing => "Corrected Missing",
            CounterType::Skipped => "Skipped",
            CounterType::Written => "Written",
        }
    }

    /// Counters reported by a job kind, in report order.
    pub fn reported_by(kind: JobKind) -> &'static [CounterType] {
        match kind {
            JobKind::Diff => &[
                CounterType::Read,
                CounterType::Mismatch,
                CounterType::CorrectedMismatch,
                CounterType::Missing,
                CounterType::CorrectedMissing,
                CounterType::Valid,
                CounterType::Skipped,
            ],
            JobKind::CopyPk => &[
                CounterType::Read,
                CounterType::Missing,
                CounterType::Skipped,
                CounterType::Written,
            ],
            JobKind::CopyRange => &[CounterType::Read, CounterType::Skipped, CounterType::Written],
        }
    }
}

fn zeroed() -> [AtomicU64; COUNTER_TYPE_COUNT] {
    std::array::from_fn(|_| AtomicU64::new(0))
}

/// Counters of one attempt on one range. Rows of the attempt update them
/// concurrently; they reach the job totals only if the attempt succeeds.
#[derive(Debug)]
pub struct AttemptCounters {
    values: [AtomicU64; COUNTER_TYPE_COUNT],
}

impl Default for AttemptCounters {
    fn default() -> Self {
        Self { values: zeroed() }
    }
}

impl AttemptCounters {
    pub fn increment(&self, counter: CounterType) {
        self.values[counter.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: CounterType) -> u64 {
        self.values[counter.index()].load(Ordering::Relaxed)
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub read: u64,
    pub valid: u64,
    pub mismatch: u64,
    pub corrected_mismatch: u64,
    pub missing: u64,
    pub corrected_missing: u64,
    pub skipped: u64,
    pub written: u64,
}

impl CounterSnapshot {
    pub fn get(&self, counter: CounterType) -> u64 {
        match counter {
            CounterType::Read => self.read,
            CounterType::Valid => self.valid,
            CounterType::Mismatch => self.mismatch,
            CounterType::CorrectedMismatch => self.corrected_mismatch,
            CounterType::Missing => self.missing,
            CounterType::CorrectedMissing => self.corrected_missing,
            CounterType::Skipped => self.skipped,
            CounterType::Written => self.written,
        }
    }
}

/// Job-wide totals. Never decremented.
#[derive(Debug)]
pub struct JobCounter {
    kind: JobKind,
    totals: [AtomicU64; COUNTER_TYPE_COUNT],
    print_stats_after: u64,
}

impl JobCounter {
    pub fn new(kind: JobKind, print_stats_after: u64) -> Self {
        Self {
            kind,
            totals: zeroed(),
            print_stats_after: print_stats_after.max(1),
        }
    }

    /// Adds one and returns the new total.
    pub fn increment(&self, counter: CounterType) -> u64 {
        self.totals[counter.index()].fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, counter: CounterType) -> u64 {
        self.totals[counter.index()].load(Ordering::Relaxed)
    }

    pub fn merge(&self, attempt: &AttemptCounters) {
        for counter in CounterType::ALL {
            let value = attempt.get(counter);
            if value > 0 {
                self.totals[counter.index()].fetch_add(value, Ordering::Relaxed);
            }
        }
    }

    /// True every `print_stats_after` reads.
    pub fn is_print_due(&self, read_count: u64) -> bool {
        read_count > 0 && read_count % self.print_stats_after == 0
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            read: self.get(CounterType::Read),
            valid: self.get(CounterType::Valid),
            mismatch: self.get(CounterType::Mismatch),
            corrected_mismatch: self.get(CounterType::CorrectedMismatch),
            missing: self.get(CounterType::Missing),
            corrected_missing: self.get(CounterType::CorrectedMissing),
            skipped: self.get(CounterType::Skipped),
            written: self.get(CounterType::Written),
        }
    }

    /// One line per reported counter; the final report is wrapped in banners.
    pub fn render(&self, is_final: bool) -> Vec<String> {
        let snapshot = self.snapshot();
        let prefix = if is_final { "Final " } else { "" };
        let mut lines = Vec::with_capacity(CounterType::reported_by(self.kind).len() + 2);
        if is_final {
            lines.push(FINAL_BANNER.to_string());
        }
        for counter in CounterType::reported_by(self.kind) {
            lines.push(format!(
                "{}{} Record Count: {}",
                prefix,
                counter.label(),
                snapshot.get(*counter)
            ));
        }
        if is_final {
            lines.push(FINAL_BANNER.to_string());
        }
        lines
    }

    pub fn print_counts(&self, context: &LogContext, is_final: bool) {
        for line in self.render(is_final) {
            log::info!("{} {}", context, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_counters_merge_into_totals() {
        let counters = JobCounter::new(JobKind::Diff, 100);
        let attempt = AttemptCounters::default();
        attempt.increment(CounterType::Read);
        attempt.increment(CounterType::Read);
        attempt.increment(CounterType::Missing);

        counters.merge(&attempt);
        counters.merge(&attempt);
        assert_eq!(counters.get(CounterType::Read), 4);
        assert_eq!(counters.get(CounterType::Missing), 2);
        assert_eq!(counters.get(CounterType::Valid), 0);
    }

    #[test]
    fn test_increment_returns_new_total() {
        let counters = JobCounter::new(JobKind::CopyPk, 2);
        assert_eq!(counters.increment(CounterType::Read), 1);
        assert_eq!(counters.increment(CounterType::Read), 2);
        assert!(counters.is_print_due(2));
        assert!(!counters.is_print_due(3));
    }

    #[test]
    fn test_render_final_has_banners() {
        let counters = JobCounter::new(JobKind::CopyPk, 100);
        counters.increment(CounterType::Read);
        counters.increment(CounterType::Written);

        let lines = counters.render(true);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].chars().all(|c| c == '#'));
        assert_eq!(lines[1], "Final Read Record Count: 1");
        assert_eq!(lines[4], "Final Written Record Count: 1");
        assert_eq!(lines[5], lines[0]);

        let periodic = counters.render(false);
        assert_eq!(periodic[0], "Read Record Count: 1");
        assert_eq!(periodic.len(), 4);
    }
}
