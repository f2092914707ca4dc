//! Statement layer: the reads and writes an engine issues, kept as semantic
//! column/filter metadata plus CQL-like text for logging.

pub mod origin_select;
pub mod session;
pub mod target_select;
pub mod target_upsert;

pub use origin_select::{OriginSelectStatement, WriteMetadataProjections};
pub use session::{Binding, BoundSelect, BoundWrite, Projection, TableSession, WriteMode};
pub use target_select::TargetSelectStatement;
pub use target_upsert::TargetUpsertStatement;

use crate::table_types::TableSchema;

pub(crate) fn token_clause(schema: &TableSchema) -> String {
    let partition_key = schema.partition_key.join(",");
    format!(
        "TOKEN({}) >= ? AND TOKEN({}) < ?",
        partition_key, partition_key
    )
}

pub(crate) fn key_clause(key_columns: &[String]) -> String {
    key_columns
        .iter()
        .map(|name| format!("{}=?", name))
        .collect::<Vec<String>>()
        .join(" AND ")
}
