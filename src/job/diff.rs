// =====================================================
// DIFF ENGINE
// Range scan of both sides, per-column comparison, optional auto-correct
// =====================================================

use crate::data::value_codec::{convert_value, format_value, values_differ};
use crate::data::{ColumnSource, PartitionRange, PkSide, PrimaryKey, Record};
use crate::error::{MigrationError, MigrationResult};
use crate::feature::GuardrailCheck;
use crate::job::context::LogContext;
use crate::job::counters::{AttemptCounters, CounterType};
use crate::job::worker::{JobWorker, UnitProcessor, WorkUnit};
use crate::table_types::DataRow;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One mismatched row and its per-column difference text.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MismatchEntry {
    pub key: String,
    pub details: String,
}

pub struct DiffJob {
    worker: Arc<JobWorker>,
    report: Mutex<Vec<MismatchEntry>>,
}

impl DiffJob {
    pub fn new(worker: Arc<JobWorker>) -> Self {
        Self {
            worker,
            report: Mutex::new(Vec::new()),
        }
    }

    /// Mismatches found by successful attempts so far, up to
    /// `mismatchReportLimit` entries.
    pub async fn mismatches(&self) -> Vec<MismatchEntry> {
        self.report.lock().await.clone()
    }

    /// Hands over the collected mismatches and frees room for new ones.
    pub async fn take_mismatches(&self) -> Vec<MismatchEntry> {
        std::mem::take(&mut *self.report.lock().await)
    }

    pub async fn get_data_and_diff(&self, range: PartitionRange) -> MigrationResult<()> {
        self.worker
            .run_range(range, |range, context, counters| {
                self.diff_attempt(range, context, counters)
            })
            .await
    }

    async fn diff_attempt(
        &self,
        range: PartitionRange,
        context: LogContext,
        counters: Arc<AttemptCounters>,
    ) -> Result<(), String> {
        let worker = &self.worker;
        let origin_select = worker.origin_select();
        let target_select = worker.target_select();
        let pk_factory = worker.pk_factory();
        let fetch_size = worker.properties().fetch_size_in_rows;

        let origin_rows = origin_select
            .execute(worker.origin(), &origin_select.bind_range(range))
            .await?;
        let target_rows = target_select
            .execute(worker.target(), &target_select.bind_range(range))
            .await?;

        let target_rows_in_slice = target_rows
            .into_iter()
            .map(|row| (pk_factory.from_row(&row, PkSide::Target), row))
            .collect::<HashMap<PrimaryKey, DataRow>>();
        log::debug!(
            "{} created map of size {} with records from target",
            context,
            target_rows_in_slice.len()
        );

        let attempt_report = Mutex::new(Vec::new());
        let mut records_to_diff = Vec::with_capacity(fetch_size);
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
            for mut record in records {
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

                worker.limiters().target_read.acquire().await;
                let target_row = target_rows_in_slice.get(record.pk()).cloned();
                record.set_target_row(target_row)?;
                records_to_diff.push(record);
                if records_to_diff.len() > fetch_size {
                    self.diff_and_clear(&mut records_to_diff, &context, &counters, &attempt_report)
                        .await;
                }
            }
        }
        self.diff_and_clear(&mut records_to_diff, &context, &counters, &attempt_report)
            .await;

        let attempt_report = attempt_report.into_inner();
        let mut report = self.report.lock().await;
        let room = worker
            .properties()
            .mismatch_report_limit
            .saturating_sub(report.len());
        if attempt_report.len() > room {
            log::warn!(
                "{} Mismatch report is full; {} entries not kept",
                context,
                attempt_report.len() - room
            );
        }
        report.extend(attempt_report.into_iter().take(room));
        Ok(())
    }

    async fn diff_and_clear(
        &self,
        records_to_diff: &mut Vec<Record>,
        context: &LogContext,
        counters: &AttemptCounters,
        report: &Mutex<Vec<MismatchEntry>>,
    ) {
        let records = std::mem::take(records_to_diff);
        stream::iter(records)
            .for_each_concurrent(self.worker.properties().row_concurrency, |record| async move {
                if let Err(e) = self.diff(&record, context, counters, report).await {
                    log::error!("{} Could not perform diff for key {}: {}", context, record.pk(), e);
                }
            })
            .await;
    }

    async fn diff(
        &self,
        record: &Record,
        context: &LogContext,
        counters: &AttemptCounters,
        report: &Mutex<Vec<MismatchEntry>>,
    ) -> Result<(), String> {
        let worker = &self.worker;
        let properties = worker.properties();

        let Some(target_row) = record.target_row() else {
            counters.increment(CounterType::Missing);
            log::error!("{} Missing target row found for key: {}", context, record.pk());
            if properties.autocorrect_missing
                && worker.is_counter_table()
                && !properties.autocorrect_missing_counter
            {
                log::error!(
                    "{} autocorrectMissing is true, but not inserting as autocorrectMissingCounter is not enabled; key: {}",
                    context,
                    record.pk()
                );
                return Ok(());
            }

            if properties.autocorrect_missing {
                worker.limiters().target_write.acquire().await;
                log::info!("{} Attempting to insert data into target: {}", context, record.pk());
                worker
                    .target_upsert()
                    .put_record(worker.target(), record)
                    .await?;
                counters.increment(CounterType::CorrectedMissing);
                log::error!("{} Inserted missing row in target: {}", context, record.pk());
            }
            return Ok(());
        };

        if !properties.skip_value_comparison {
            let diff_data = self.is_different(record, target_row);
            if !diff_data.is_empty() {
                counters.increment(CounterType::Mismatch);
                log::error!(
                    "{} Mismatch row found for key: {} Mismatch: {}",
                    context,
                    record.pk(),
                    diff_data
                );
                let mut entries = report.lock().await;
                if entries.len() < properties.mismatch_report_limit {
                    entries.push(MismatchEntry {
                        key: record.pk().to_string(),
                        details: diff_data,
                    });
                }
                drop(entries);

                if properties.autocorrect_mismatch {
                    worker.limiters().target_write.acquire().await;
                    worker
                        .target_upsert()
                        .put_record(worker.target(), record)
                        .await?;
                    counters.increment(CounterType::CorrectedMismatch);
                    log::error!("{} Corrected mismatch row in target: {}", context, record.pk());
                }
                return Ok(());
            }
        }

        counters.increment(CounterType::Valid);
        Ok(())
    }

    /// Difference text over every target column; empty when the row matches.
    fn is_different(&self, record: &Record, target_row: &DataRow) -> String {
        let mapping = self.worker.mapping();
        let mut diff_data = String::new();

        for target_index in 0..mapping.len() {
            let column_name = mapping.target_name(target_index);
            let context = LogContext::column(record.pk(), column_name);
            match self.compare_column(target_index, record, target_row, &context) {
                Ok(None) => {}
                Ok(Some(difference)) => diff_data.push_str(&difference),
                Err((origin_index, e)) => diff_data.push_str(&format!(
                    "Target column:{} Exception {} targetIndex:{} originIndex:{}; ",
                    column_name, e, target_index, origin_index
                )),
            }
        }
        diff_data
    }

    /// `Err` carries the origin index (-1 when the source is not an origin
    /// column) for the exception entry.
    fn compare_column(
        &self,
        target_index: usize,
        record: &Record,
        target_row: &DataRow,
        context: &LogContext,
    ) -> Result<Option<String>, (i64, String)> {
        let mapping = self.worker.mapping();
        let column_name = mapping.target_name(target_index);
        let source = mapping
            .source(target_index)
            .ok_or_else(|| (-1, format!("No mapping for target index {}", target_index)))?;
        let origin_index = match source {
            ColumnSource::Origin(origin_index) => *origin_index as i64,
            _ => -1,
        };

        if let ColumnSource::Constant(_) = source {
            log::trace!("{} skipping constant column", context);
            return Ok(None);
        }
        let upper_name = column_name.to_uppercase();
        if upper_name.contains("TTL") || upper_name.contains("WRITETIME") {
            return Ok(None);
        }

        let target_type = mapping
            .target_type(target_index)
            .ok_or_else(|| (origin_index, format!("No target type at index {}", target_index)))?;
        let comparison_type = mapping
            .comparison_type(target_index)
            .ok_or_else(|| (origin_index, format!("No origin type for target index {}", target_index)))?;
        let target_value = target_row.get(target_index).ok_or_else(|| {
            (
                origin_index,
                format!("Target row has no value at index {}", target_index),
            )
        })?;
        let target_as_origin_type = convert_value(target_value, target_type, comparison_type)
            .map_err(|e| (origin_index, e))?;

        let origin_value = match source {
            ColumnSource::Origin(index) => record.origin_row().get(*index).cloned().ok_or_else(|| {
                (origin_index, format!("Origin row has no value at index {}", index))
            })?,
            ColumnSource::ExplodeKey => record.pk().explode_map_key().cloned().unwrap_or(Value::Null),
            ColumnSource::ExplodeValue => {
                record.pk().explode_map_value().cloned().unwrap_or(Value::Null)
            }
            ColumnSource::Constant(_) => Value::Null,
        };

        log::debug!(
            "{} Diff target/origin index: {}/{} target/origin value: {}/{}",
            context,
            target_index,
            origin_index,
            target_as_origin_type,
            origin_value
        );

        if origin_value.is_null()
            || !values_differ(comparison_type, &origin_value, &target_as_origin_type)
        {
            return Ok(None);
        }
        Ok(Some(format!(
            "Target column:{}-origin[{}]-target[{}]; ",
            column_name,
            format_value(comparison_type, &origin_value),
            format_value(comparison_type, &target_as_origin_type)
        )))
    }
}

#[async_trait::async_trait]
impl UnitProcessor for DiffJob {
    fn worker(&self) -> &JobWorker {
        &self.worker
    }

    fn accepts(&self, unit: &WorkUnit) -> bool {
        matches!(unit, WorkUnit::Range(_))
    }

    async fn process_unit(&self, unit: WorkUnit) -> MigrationResult<()> {
        match unit {
            WorkUnit::Range(range) => self.get_data_and_diff(range).await,
            other => Err(MigrationError::Config(format!(
                "Diff job cannot process {}",
                other
            ))),
        }
    }
}
