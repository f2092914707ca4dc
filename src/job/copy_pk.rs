// =====================================================
// COPY BY PRIMARY KEY
// Origin lookup and target upsert for an explicit list of keys
// =====================================================

use crate::data::{PkSide, Record};
use crate::error::{MigrationError, MigrationResult};
use crate::job::context::LogContext;
use crate::job::counters::CounterType;
use crate::job::worker::{JobWorker, UnitProcessor, WorkUnit};
use crate::properties::JobKind;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

pub struct CopyPkJob {
    worker: Arc<JobWorker>,
}

impl CopyPkJob {
    pub fn new(worker: Arc<JobWorker>) -> Self {
        Self { worker }
    }

    /// Copies every batch, then emits the final counter snapshot.
    pub async fn get_row_and_insert(&self, rows_list: Vec<Vec<String>>) {
        for rows in rows_list {
            self.copy_batch(rows).await;
        }
        self.worker
            .counters()
            .print_counts(&LogContext::job(JobKind::CopyPk.as_str()), true);
    }

    async fn copy_batch(&self, rows: Vec<String>) {
        stream::iter(rows)
            .for_each_concurrent(self.worker.properties().row_concurrency, |row| async move {
                let context = LogContext::key(&row);
                let read_count = self.copy_row(&row, &context).await;
                if self.worker.counters().is_print_due(read_count) {
                    self.worker.counters().print_counts(&context, false);
                }
            })
            .await;
    }

    /// Returns the read count after this row.
    async fn copy_row(&self, row: &str, context: &LogContext) -> u64 {
        let worker = &self.worker;
        let counters = worker.counters();
        let read_count = counters.increment(CounterType::Read);

        let pk = worker.pk_factory().decode_serialized(row);
        if pk.is_error() {
            counters.increment(CounterType::Missing);
            log::error!(
                "{} Could not build PK object with value <{}>; error is: {:?}",
                context,
                row,
                pk.messages()
            );
            return read_count;
        }

        let origin_select = worker.origin_select();
        let bound = match origin_select.bind_pk(&pk) {
            Ok(bound) => bound,
            Err(e) => {
                counters.increment(CounterType::Missing);
                log::error!("{} Could not bind primary-key {}: {}", context, row, e);
                return read_count;
            }
        };
        worker.limiters().origin_read.acquire().await;
        let origin_row = match origin_select.execute(worker.origin(), &bound).await {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                counters.increment(CounterType::Missing);
                log::error!("{} Could not read origin row with primary-key {}: {}", context, row, e);
                return read_count;
            }
        };
        let Some(origin_row) = origin_row else {
            counters.increment(CounterType::Missing);
            log::error!("{} Could not find origin row with primary-key: {}", context, row);
            return read_count;
        };

        let origin_row = Arc::new(origin_row);
        let record = Record::new(
            worker.pk_factory().from_row(&origin_row, PkSide::Origin),
            origin_row,
        );
        if origin_select.should_filter_record(&record) {
            counters.increment(CounterType::Skipped);
            return read_count;
        }

        let records = match worker.pk_factory().to_valid_record_list(record) {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => {
                log::warn!("{} Exploded map has no entries; row skipped", context);
                counters.increment(CounterType::Skipped);
                return read_count;
            }
            Err(e) => {
                log::error!("{} {}", context, e);
                counters.increment(CounterType::Skipped);
                return read_count;
            }
        };
        for record in records {
            worker.limiters().target_write.acquire().await;
            match worker.target_upsert().put_record(worker.target(), &record).await {
                Ok(()) => {
                    counters.increment(CounterType::Written);
                }
                Err(e) => log::error!(
                    "{} Could not write key {} to target: {}",
                    context,
                    record.pk(),
                    e
                ),
            }
        }
        read_count
    }
}

#[async_trait::async_trait]
impl UnitProcessor for CopyPkJob {
    fn worker(&self) -> &JobWorker {
        &self.worker
    }

    fn accepts(&self, unit: &WorkUnit) -> bool {
        matches!(unit, WorkUnit::Keys(_))
    }

    async fn process_unit(&self, unit: WorkUnit) -> MigrationResult<()> {
        match unit {
            WorkUnit::Keys(rows) => {
                self.copy_batch(rows).await;
                Ok(())
            }
            other => Err(MigrationError::Config(format!(
                "Copy by primary key job cannot process {}",
                other
            ))),
        }
    }
}
