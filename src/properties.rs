use crate::error::{MigrationError, MigrationResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_fetch_size_in_rows() -> usize {
    1_000
}

fn default_print_stats_after() -> u64 {
    100_000
}

fn default_rate_limit() -> u32 {
    20_000
}

fn default_row_concurrency() -> usize {
    8
}

fn default_range_concurrency() -> usize {
    4
}

fn default_mismatch_report_limit() -> usize {
    10_000
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum JobKind {
    CopyPk,
    CopyRange,
    #[default]
    Diff,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::CopyPk => "copy_pk",
            JobKind::CopyRange => "copy_range",
            JobKind::Diff => "diff",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterColumnSpec {
    pub name: String,
    pub value: String,
}

/// `value` is the textual literal, parsed with the target column's type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstantColumnSpec {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplodeMapSpec {
    pub origin_column: String,
    pub key_column: String,
    pub value_column: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MigrationProperties {
    #[serde(default)]
    pub job_kind: JobKind,
    #[serde(default)]
    pub autocorrect_missing: bool,
    #[serde(default)]
    pub autocorrect_mismatch: bool,
    #[serde(default)]
    pub autocorrect_missing_counter: bool,
    #[serde(default)]
    pub skip_value_comparison: bool,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_fetch_size_in_rows")]
    pub fetch_size_in_rows: usize,
    #[serde(default = "default_print_stats_after")]
    pub print_stats_after: u64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_origin_reads: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_target_reads: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_target_writes: u32,
    #[serde(default = "default_row_concurrency")]
    pub row_concurrency: usize,
    #[serde(default = "default_range_concurrency")]
    pub range_concurrency: usize,
    #[serde(default)]
    pub filter_column: Option<FilterColumnSpec>,
    #[serde(default)]
    pub min_write_timestamp_filter: Option<i64>,
    #[serde(default)]
    pub max_write_timestamp_filter: Option<i64>,
    #[serde(default)]
    pub writetime_columns: Vec<String>,
    #[serde(default)]
    pub ttl_columns: Vec<String>,
    #[serde(default)]
    pub constant_columns: Vec<ConstantColumnSpec>,
    #[serde(default)]
    pub explode_map: Option<ExplodeMapSpec>,
    #[serde(default)]
    pub guardrail_column_size_kb: Option<u32>,
    #[serde(default)]
    pub null_timestamp_pk_default: Option<i64>,
    #[serde(default)]
    pub failed_partitions_file: Option<PathBuf>,
    /// Mismatch entries a diff job keeps for its report; counters are not
    /// affected.
    #[serde(default = "default_mismatch_report_limit")]
    pub mismatch_report_limit: usize,
}

impl Default for MigrationProperties {
    fn default() -> Self {
        Self {
            job_kind: JobKind::default(),
            autocorrect_missing: false,
            autocorrect_mismatch: false,
            autocorrect_missing_counter: false,
            skip_value_comparison: false,
            max_retries: 0,
            fetch_size_in_rows: default_fetch_size_in_rows(),
            print_stats_after: default_print_stats_after(),
            rate_limit_origin_reads: default_rate_limit(),
            rate_limit_target_reads: default_rate_limit(),
            rate_limit_target_writes: default_rate_limit(),
            row_concurrency: default_row_concurrency(),
            range_concurrency: default_range_concurrency(),
            filter_column: None,
            min_write_timestamp_filter: None,
            max_write_timestamp_filter: None,
            writetime_columns: Vec::new(),
            ttl_columns: Vec::new(),
            constant_columns: Vec::new(),
            explode_map: None,
            guardrail_column_size_kb: None,
            null_timestamp_pk_default: None,
            failed_partitions_file: None,
            mismatch_report_limit: default_mismatch_report_limit(),
        }
    }
}

impl MigrationProperties {
    pub fn from_json_str(raw: &str) -> MigrationResult<Self> {
        let properties: MigrationProperties = serde_json::from_str(raw).map_err(|e| {
            MigrationError::Config(format!("Failed to parse migration properties: {}", e))
        })?;
        properties.validate().map_err(MigrationError::Config)?;
        Ok(properties)
    }

    pub fn from_json_file(path: &Path) -> MigrationResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::Config(format!(
                "Failed to read migration properties from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_size_in_rows == 0 {
            return Err("fetchSizeInRows must be greater than 0".to_string());
        }
        if self.print_stats_after == 0 {
            return Err("printStatsAfter must be greater than 0".to_string());
        }
        for (label, value) in [
            ("rateLimitOriginReads", self.rate_limit_origin_reads),
            ("rateLimitTargetReads", self.rate_limit_target_reads),
            ("rateLimitTargetWrites", self.rate_limit_target_writes),
        ] {
            if value == 0 {
                return Err(format!("{} must be greater than 0", label));
            }
        }
        if self.row_concurrency == 0 {
            return Err("rowConcurrency must be greater than 0".to_string());
        }
        if self.range_concurrency == 0 {
            return Err("rangeConcurrency must be greater than 0".to_string());
        }

        if let Some(filter) = &self.filter_column {
            if filter.name.trim().is_empty() {
                return Err("filterColumn has an empty name".to_string());
            }
        }

        if let (Some(min), Some(max)) = (
            self.min_write_timestamp_filter,
            self.max_write_timestamp_filter,
        ) {
            if min > max {
                return Err(format!(
                    "minWriteTimestampFilter ({}) is greater than maxWriteTimestampFilter ({})",
                    min, max
                ));
            }
        }
        if self.has_write_timestamp_filter() && self.writetime_columns.is_empty() {
            return Err(
                "A write timestamp filter needs at least one entry in writetimeColumns".to_string(),
            );
        }

        for (index, constant) in self.constant_columns.iter().enumerate() {
            if constant.name.trim().is_empty() {
                return Err(format!("Constant column {} has an empty name", index + 1));
            }
        }

        if let Some(explode) = &self.explode_map {
            if explode.origin_column.trim().is_empty()
                || explode.key_column.trim().is_empty()
                || explode.value_column.trim().is_empty()
            {
                return Err(
                    "explodeMap requires originColumn, keyColumn and valueColumn".to_string(),
                );
            }
        }

        if self.guardrail_column_size_kb == Some(0) {
            return Err("guardrailColumnSizeKb must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Configured failed-partition file, or `<keyspace.table>_partitions.csv`
    /// in the working directory.
    pub fn failed_partitions_path(&self, origin_keyspace_table: &str) -> PathBuf {
        self.failed_partitions_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_partitions.csv", origin_keyspace_table)))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn has_write_timestamp_filter(&self) -> bool {
        self.min_write_timestamp_filter.is_some() || self.max_write_timestamp_filter.is_some()
    }

    /// Inclusive bounds; an unset side is open.
    pub fn write_timestamp_window(&self) -> Option<(i64, i64)> {
        if !self.has_write_timestamp_filter() {
            return None;
        }
        Some((
            self.min_write_timestamp_filter.unwrap_or(i64::MIN),
            self.max_write_timestamp_filter.unwrap_or(i64::MAX),
        ))
    }

    pub fn log_summary(&self) {
        log::info!("PARAM -- Job Kind: {}", self.job_kind.as_str());
        log::info!("PARAM -- Autocorrect Missing: {}", self.autocorrect_missing);
        log::info!("PARAM -- Autocorrect Mismatch: {}", self.autocorrect_mismatch);
        log::info!(
            "PARAM -- Autocorrect Missing Counter: {}",
            self.autocorrect_missing_counter
        );
        log::info!("PARAM -- Skip Value Comparison: {}", self.skip_value_comparison);
        log::info!("PARAM -- Max Retries: {}", self.max_retries);
        log::info!("PARAM -- Fetch Size In Rows: {}", self.fetch_size_in_rows);
        log::info!(
            "PARAM -- Rate Limits (origin read / target read / target write): {} / {} / {}",
            self.rate_limit_origin_reads,
            self.rate_limit_target_reads,
            self.rate_limit_target_writes
        );
        if let Some((min, max)) = self.write_timestamp_window() {
            log::info!("PARAM -- Write Timestamp Filter: [{}, {}]", min, max);
        }
    }
}

#[cfg(test)]
mod tests;
