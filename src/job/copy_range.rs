use crate::data::{PartitionRange, PkSide, Record};
use crate::error::{MigrationError, MigrationResult};
use crate::feature::GuardrailCheck;
use crate::job::context::LogContext;
use crate::job::counters::{AttemptCounters, CounterType};
use crate::job::worker::{JobWorker, UnitProcessor, WorkUnit};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Range migration: every origin row of a range that passes the filter and
/// the guardrail is upserted into the target, without comparing.
pub struct CopyRangeJob {
    worker: Arc<JobWorker>,
}

impl CopyRangeJob {
    pub fn new(worker: Arc<JobWorker>) -> Self {
        Self { worker }
    }

    pub async fn get_data_and_insert(&self, range: PartitionRange) -> MigrationResult<()> {
        self.worker
            .run_range(range, |range, context, counters| {
                self.copy_attempt(range, context, counters)
            })
            .await
    }

    async fn copy_attempt(
        &self,
        range: PartitionRange,
        context: LogContext,
        counters: Arc<AttemptCounters>,
    ) -> Result<(), String> {
        let worker = &self.worker;
        let origin_select = worker.origin_select();
        let pk_factory = worker.pk_factory();

        let origin_rows = origin_select
            .execute(worker.origin(), &origin_select.bind_range(range))
            .await?;

        let mut records_to_write = Vec::new();
        for origin_row in origin_rows {
            worker.limiters().origin_read.acquire().await;
            let origin_row = Arc::new(origin_row);
            let record = Record::new(
                pk_factory.from_row(&origin_row, PkSide::Origin),
                origin_row,
            );
            counters.increment(CounterType::Read);

            if origin_select.should_filter_record(&record) {
                counters.increment(CounterType::Skipped);
                continue;
            }
            let records = match pk_factory.to_valid_record_list(record) {
                Ok(records) if !records.is_empty() => records,
                Ok(_) => {
                    log::warn!("{} Exploded map has no entries; row skipped", context);
                    counters.increment(CounterType::Skipped);
                    continue;
                }
                Err(e) => {
                    log::error!("{} {}", context, e);
                    counters.increment(CounterType::Skipped);
                    continue;
                }
            };
            for record in records {
                if let GuardrailCheck::Failed(message) = worker.guardrail().check(&record) {
                    log::error!(
                        "{} Guardrails failed for PrimaryKey {}; {}",
                        context,
                        record.pk(),
                        message
                    );
                    counters.increment(CounterType::Skipped);
                    continue;
                }
                records_to_write.push(record);
            }
        }

        let results = stream::iter(records_to_write)
            .map(|record| {
                let counters = Arc::clone(&counters);
                async move {
                    worker.limiters().target_write.acquire().await;
                    worker
                        .target_upsert()
                        .put_record(worker.target(), &record)
                        .await
                        .map_err(|e| format!("Write of key {} failed: {}", record.pk(), e))?;
                    counters.increment(CounterType::Written);
                    Ok::<(), String>(())
                }
            })
            .buffer_unordered(worker.properties().row_concurrency)
            .collect::<Vec<Result<(), String>>>()
            .await;
        results.into_iter().collect::<Result<Vec<()>, String>>()?;

        log::debug!("{} wrote {} record(s)", context, counters.get(CounterType::Written));
        Ok(())
    }
}

#[async_trait::async_trait]
impl UnitProcessor for CopyRangeJob {
    fn worker(&self) -> &JobWorker {
        &self.worker
    }

    fn accepts(&self, unit: &WorkUnit) -> bool {
        matches!(unit, WorkUnit::Range(_))
    }

    async fn process_unit(&self, unit: WorkUnit) -> MigrationResult<()> {
        match unit {
            WorkUnit::Range(range) => self.get_data_and_insert(range).await,
            other => Err(MigrationError::Config(format!(
                "Range copy job cannot process {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests;
