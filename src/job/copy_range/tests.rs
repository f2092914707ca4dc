use super::*;
use crate::memory_table::MemoryTable;
use crate::properties::{ExplodeMapSpec, JobKind};
use crate::statement::{Binding, BoundSelect, Projection, TableSession};
use crate::table_types::{ColumnDef, ColumnType, TableSchema};
use crate::test_support::{full_range, properties, table_with, user, users_schema, worker};
use serde_json::json;

#[tokio::test]
async fn test_copies_every_row_of_split_ranges() {
    let origin = table_with(
        users_schema("ks.origin"),
        (1..=40).map(|id| user(id, "u", id)).collect(),
    )
    .await;
    let target = Arc::new(MemoryTable::new(users_schema("ks.target")));
    let worker = worker(properties(JobKind::CopyRange), &origin, &target);
    let job = CopyRangeJob::new(Arc::clone(&worker));

    for range in full_range().split(3) {
        job.get_data_and_insert(range).await.unwrap();
    }

    assert_eq!(worker.counters().get(CounterType::Read), 40);
    assert_eq!(worker.counters().get(CounterType::Written), 40);
    assert_eq!(target.rows().await, origin.rows().await);
}

#[tokio::test]
async fn test_guardrail_skips_large_rows() {
    let origin = table_with(
        users_schema("ks.origin"),
        vec![user(1, "small", 1), user(2, &"x".repeat(2048), 2)],
    )
    .await;
    let target = Arc::new(MemoryTable::new(users_schema("ks.target")));
    let mut properties = properties(JobKind::CopyRange);
    properties.guardrail_column_size_kb = Some(1);
    let worker = worker(properties, &origin, &target);

    CopyRangeJob::new(Arc::clone(&worker))
        .get_data_and_insert(full_range())
        .await
        .unwrap();

    assert_eq!(worker.counters().get(CounterType::Read), 2);
    assert_eq!(worker.counters().get(CounterType::Skipped), 1);
    assert_eq!(worker.counters().get(CounterType::Written), 1);
    assert!(target.get(&[json!(2)]).await.is_none());
}

#[tokio::test]
async fn test_write_failure_retries_the_range() {
    let origin = table_with(users_schema("ks.origin"), vec![user(1, "a", 1)]).await;
    let target = Arc::new(MemoryTable::new(users_schema("ks.target")));
    let mut properties = properties(JobKind::CopyRange);
    properties.max_retries = 1;
    let worker = worker(properties, &origin, &target);
    target.fail_next_writes(1);

    CopyRangeJob::new(Arc::clone(&worker))
        .get_data_and_insert(full_range())
        .await
        .unwrap();

    assert_eq!(origin.range_read_count(), 2);
    assert_eq!(worker.counters().get(CounterType::Read), 1);
    assert_eq!(worker.counters().get(CounterType::Written), 1);
}

#[tokio::test]
async fn test_ttl_and_write_timestamp_are_carried() {
    let origin = Arc::new(MemoryTable::new(users_schema("ks.origin")));
    origin
        .insert_row(user(1, "a", 1), Some(3600), Some(1_700_000_000_000_000))
        .await
        .unwrap();
    let target = Arc::new(MemoryTable::new(users_schema("ks.target")));
    let mut properties = properties(JobKind::CopyRange);
    properties.ttl_columns = vec!["name".to_string()];
    properties.writetime_columns = vec!["name".to_string()];
    let worker = worker(properties, &origin, &target);

    CopyRangeJob::new(Arc::clone(&worker))
        .get_data_and_insert(full_range())
        .await
        .unwrap();

    let rows = target
        .select(&BoundSelect {
            cql: String::new(),
            projections: vec![
                Projection::Ttl("name".to_string()),
                Projection::WriteTime("name".to_string()),
            ],
            binding: Binding::PrimaryKey(vec![json!(1)]),
        })
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![json!(3600), json!(1_700_000_000_000_000i64)]]);
}

#[tokio::test]
async fn test_exploded_map_writes_one_row_per_entry_and_skips_the_rest() {
    let origin_schema = TableSchema::new(
        "ks.origin",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("attrs", ColumnType::from_cql("map<text,int>").unwrap()),
        ],
        &["id"],
        &[],
    )
    .unwrap();
    let target_schema = TableSchema::new(
        "ks.target",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("attr", ColumnType::Text),
            ColumnDef::new("amount", ColumnType::BigInt),
        ],
        &["id"],
        &["attr"],
    )
    .unwrap();
    let origin = table_with(
        origin_schema,
        vec![
            vec![json!(1), json!({"red": 1, "blue": 2})],
            vec![json!(2), serde_json::Value::Null],
            vec![json!(3), json!("not a map")],
        ],
    )
    .await;
    let target = Arc::new(MemoryTable::new(target_schema));
    let mut properties = properties(JobKind::CopyRange);
    properties.explode_map = Some(ExplodeMapSpec {
        origin_column: "attrs".to_string(),
        key_column: "attr".to_string(),
        value_column: "amount".to_string(),
    });
    let worker = worker(properties, &origin, &target);

    CopyRangeJob::new(Arc::clone(&worker))
        .get_data_and_insert(full_range())
        .await
        .unwrap();

    assert_eq!(worker.counters().get(CounterType::Read), 3);
    assert_eq!(worker.counters().get(CounterType::Written), 2);
    assert_eq!(worker.counters().get(CounterType::Skipped), 2);
    assert_eq!(
        target.get(&[json!(1), json!("red")]).await,
        Some(vec![json!(1), json!("red"), json!(1)])
    );
    assert_eq!(
        target.get(&[json!(1), json!("blue")]).await,
        Some(vec![json!(1), json!("blue"), json!(2)])
    );
}
