use crate::data::PartitionRange;
use crate::error::{MigrationError, MigrationResult};
use crate::job::context::LogContext;
use crate::job::copy_pk::CopyPkJob;
use crate::job::copy_range::CopyRangeJob;
use crate::job::counters::CounterSnapshot;
use crate::job::diff::DiffJob;
use crate::job::failure_log::FailedPartitionLog;
use crate::job::worker::{JobWorker, UnitProcessor, WorkUnit};
use crate::properties::{JobKind, MigrationProperties};
use crate::statement::TableSession;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_kind: JobKind,
    pub units: usize,
    pub counters: CounterSnapshot,
    pub failed_units: Vec<String>,
}

/// Explicitly constructed job: builds the shared worker once, picks the
/// strategy for the configured job kind and drives units through it on a
/// bounded pool of `rangeConcurrency` workers.
pub struct MigrationJob {
    kind: JobKind,
    processor: Arc<dyn UnitProcessor>,
}

impl MigrationJob {
    pub fn new(
        properties: MigrationProperties,
        origin: Arc<dyn TableSession>,
        target: Arc<dyn TableSession>,
    ) -> MigrationResult<Self> {
        let kind = properties.job_kind;
        properties.log_summary();
        let worker = Arc::new(JobWorker::build(properties, origin, target)?);
        let processor: Arc<dyn UnitProcessor> = match kind {
            JobKind::CopyPk => Arc::new(CopyPkJob::new(worker)),
            JobKind::CopyRange => Arc::new(CopyRangeJob::new(worker)),
            JobKind::Diff => Arc::new(DiffJob::new(worker)),
        };
        Ok(Self { kind, processor })
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn worker(&self) -> &JobWorker {
        self.processor.worker()
    }

    pub async fn run(&self, units: Vec<WorkUnit>) -> MigrationResult<JobSummary> {
        if let Some(unit) = units.iter().find(|unit| !self.processor.accepts(unit)) {
            return Err(MigrationError::Config(format!(
                "{} job cannot process {}",
                self.kind.as_str(),
                unit
            )));
        }

        let unit_count = units.len();
        let concurrency = self.worker().properties().range_concurrency;
        let results = stream::iter(units)
            .map(|unit| {
                let processor = Arc::clone(&self.processor);
                async move {
                    let label = unit.to_string();
                    (label, processor.process_unit(unit).await)
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<(String, MigrationResult<()>)>>()
            .await;

        let mut failed_units = Vec::new();
        for (label, result) in results {
            match result {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::error!("{} failed: {}", label, e);
                    failed_units.push(label);
                }
            }
        }

        let counters = self.worker().counters();
        counters.print_counts(&LogContext::job(self.kind.as_str()), true);
        Ok(JobSummary {
            job_kind: self.kind,
            units: unit_count,
            counters: counters.snapshot(),
            failed_units,
        })
    }

    pub async fn run_ranges(&self, ranges: Vec<PartitionRange>) -> MigrationResult<JobSummary> {
        self.run(ranges.into_iter().map(WorkUnit::Range).collect())
            .await
    }

    pub async fn run_keys(&self, batches: Vec<Vec<String>>) -> MigrationResult<JobSummary> {
        self.run(batches.into_iter().map(WorkUnit::Keys).collect())
            .await
    }

    /// Reruns the ranges recorded in a failed partition file.
    pub async fn rerun_failed(&self, path: &Path) -> MigrationResult<JobSummary> {
        let ranges = FailedPartitionLog::read_ranges(path)?;
        log::info!(
            "Rerunning {} failed range(s) from {}",
            ranges.len(),
            path.display()
        );
        self.run_ranges(ranges).await
    }
}
