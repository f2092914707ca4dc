use crate::data::record::Record;
use crate::data::value_codec::value_to_text;
use crate::properties::MigrationProperties;
use crate::table_types::{ColumnType, TableSchema};
use serde_json::Value;

const BYTES_PER_KB: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailCheck {
    Clean,
    Failed(String),
}

impl GuardrailCheck {
    pub fn is_clean(&self) -> bool {
        matches!(self, GuardrailCheck::Clean)
    }
}

/// Pre-write column size check on origin rows.
#[derive(Debug, Clone, Default)]
pub struct Guardrail {
    column_size_limit_bytes: Option<usize>,
    origin_column_names: Vec<String>,
    origin_column_types: Vec<ColumnType>,
}

impl Guardrail {
    pub fn build(properties: &MigrationProperties, origin: &TableSchema) -> Self {
        Self {
            column_size_limit_bytes: properties
                .guardrail_column_size_kb
                .map(|kb| kb as usize * BYTES_PER_KB),
            origin_column_names: origin.column_names(),
            origin_column_types: origin.column_types(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.column_size_limit_bytes.is_some()
    }

    pub fn check(&self, record: &Record) -> GuardrailCheck {
        let Some(limit) = self.column_size_limit_bytes else {
            return GuardrailCheck::Clean;
        };

        // Projections appended after the schema columns are not user data.
        let oversized = self
            .origin_column_names
            .iter()
            .zip(self.origin_column_types.iter())
            .zip(record.origin_row().iter())
            .filter_map(|((name, column_type), value)| {
                let size = cell_size_bytes(column_type, value);
                (size > limit).then(|| format!("{}({}KB)", name, size / BYTES_PER_KB))
            })
            .collect::<Vec<String>>();

        if oversized.is_empty() {
            GuardrailCheck::Clean
        } else {
            GuardrailCheck::Failed(format!(
                "Large columns exceeding {}KB: {}",
                limit / BYTES_PER_KB,
                oversized.join(", ")
            ))
        }
    }
}

/// Blob cells hold `0x`-prefixed hex, so their stored size is half the
/// digits.
fn cell_size_bytes(column_type: &ColumnType, value: &Value) -> usize {
    match (column_type, value) {
        (ColumnType::Blob, Value::String(text)) => {
            text.strip_prefix("0x").unwrap_or(text).len() / 2
        }
        (_, Value::Array(_) | Value::Object(_)) => value.to_string().len(),
        (_, other) => value_to_text(other).len(),
    }
}
