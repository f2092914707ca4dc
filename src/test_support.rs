//! Fixtures shared by the engine tests.

use crate::data::PartitionRange;
use crate::job::JobWorker;
use crate::memory_table::MemoryTable;
use crate::properties::{JobKind, MigrationProperties};
use crate::statement::TableSession;
use crate::table_types::{ColumnDef, ColumnType, DataRow, TableSchema};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) fn users_schema(keyspace_table: &str) -> TableSchema {
    TableSchema::new(
        keyspace_table,
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("score", ColumnType::Int),
        ],
        &["id"],
        &[],
    )
    .unwrap()
}

pub(crate) fn user(id: i64, name: &str, score: i64) -> DataRow {
    vec![json!(id), json!(name), json!(score)]
}

pub(crate) async fn table_with(schema: TableSchema, rows: Vec<DataRow>) -> Arc<MemoryTable> {
    let table = MemoryTable::new(schema);
    for row in rows {
        table.insert(row).await.unwrap();
    }
    Arc::new(table)
}

/// Properties with limits high enough that permits never wait, and a
/// failed-partition file under the temp directory.
pub(crate) fn properties(kind: JobKind) -> MigrationProperties {
    MigrationProperties {
        job_kind: kind,
        rate_limit_origin_reads: u32::MAX,
        rate_limit_target_reads: u32::MAX,
        rate_limit_target_writes: u32::MAX,
        failed_partitions_file: Some(temp_path("failed-partitions")),
        ..MigrationProperties::default()
    }
}

pub(crate) fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}.csv", name, uuid::Uuid::new_v4()))
}

pub(crate) fn worker(
    properties: MigrationProperties,
    origin: &Arc<MemoryTable>,
    target: &Arc<MemoryTable>,
) -> Arc<JobWorker> {
    let origin: Arc<dyn TableSession> = origin.clone();
    let target: Arc<dyn TableSession> = target.clone();
    Arc::new(JobWorker::build(properties, origin, target).unwrap())
}

pub(crate) fn full_range() -> PartitionRange {
    PartitionRange::murmur3_full()
}
