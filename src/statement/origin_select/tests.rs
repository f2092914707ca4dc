use super::*;
use crate::data::{ColumnMapping, PkFactory, PkSide};
use crate::feature::ConstantColumns;
use crate::properties::FilterColumnSpec;
use crate::table_types::ColumnDef;
use serde_json::json;
use std::sync::Arc;

fn origin() -> TableSchema {
    TableSchema::new(
        "ks.users",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("status", ColumnType::Text),
        ],
        &["id"],
        &[],
    )
    .unwrap()
}

fn record_for(statement: &OriginSelectStatement, row: DataRow) -> Record {
    let schema = origin();
    let mapping =
        Arc::new(ColumnMapping::build(&schema, &schema, &ConstantColumns::default(), None).unwrap());
    let factory = PkFactory::new(
        &schema,
        &schema,
        mapping,
        None,
        statement.write_metadata().clone(),
        None,
    )
    .unwrap();
    let pk = factory.from_row(&row, PkSide::Origin);
    Record::new(pk, Arc::new(row))
}

#[test]
fn test_cql_text_includes_projections() {
    let mut properties = MigrationProperties::default();
    properties.ttl_columns = vec!["name".to_string()];
    properties.writetime_columns = vec!["name".to_string(), "status".to_string()];
    let statement = OriginSelectStatement::build(&origin(), &properties).unwrap();

    assert_eq!(
        statement.range_cql(),
        "SELECT id,name,status,TTL(name) AS ttl_name,WRITETIME(name) AS writetime_name,WRITETIME(status) AS writetime_status FROM ks.users WHERE TOKEN(id) >= ? AND TOKEN(id) < ?"
    );
    assert!(statement.pk_cql().ends_with("FROM ks.users WHERE id=?"));
    assert_eq!(statement.projections().len(), 6);
}

#[test]
fn test_metadata_columns_must_be_regular_columns() {
    let mut properties = MigrationProperties::default();
    properties.writetime_columns = vec!["id".to_string()];
    assert!(OriginSelectStatement::build(&origin(), &properties).is_err());

    properties.writetime_columns = vec!["missing".to_string()];
    assert!(OriginSelectStatement::build(&origin(), &properties).is_err());
}

#[test]
fn test_largest_write_timestamp_and_ttl() {
    let mut properties = MigrationProperties::default();
    properties.ttl_columns = vec!["name".to_string(), "status".to_string()];
    properties.writetime_columns = vec!["name".to_string(), "status".to_string()];
    let statement = OriginSelectStatement::build(&origin(), &properties).unwrap();

    let row = vec![
        json!(1),
        json!("a"),
        json!("b"),
        json!(30),
        Value::Null,
        json!(1000),
        json!(2000),
    ];
    assert_eq!(statement.largest_ttl(&row), Some(30));
    assert_eq!(statement.largest_write_timestamp(&row), Some(2000));

    let plain = OriginSelectStatement::build(&origin(), &MigrationProperties::default()).unwrap();
    assert_eq!(plain.largest_write_timestamp(&row), None);
    assert_eq!(plain.largest_ttl(&row), None);
}

#[test]
fn test_filter_column_is_trimmed_and_case_insensitive() {
    let mut properties = MigrationProperties::default();
    properties.filter_column = Some(FilterColumnSpec {
        name: "status".to_string(),
        value: "deleted".to_string(),
    });
    let statement = OriginSelectStatement::build(&origin(), &properties).unwrap();

    let removed = record_for(&statement, vec![json!(1), json!("a"), json!("  DELETED ")]);
    let kept = record_for(&statement, vec![json!(2), json!("b"), json!("active")]);
    assert!(statement.should_filter_record(&removed));
    assert!(!statement.should_filter_record(&kept));
}

#[test]
fn test_write_timestamp_window_is_inclusive() {
    let mut properties = MigrationProperties::default();
    properties.writetime_columns = vec!["name".to_string()];
    properties.min_write_timestamp_filter = Some(100);
    properties.max_write_timestamp_filter = Some(200);
    let statement = OriginSelectStatement::build(&origin(), &properties).unwrap();

    let row = |id: i64, write_timestamp: Value| vec![json!(id), json!("n"), json!("s"), write_timestamp];
    assert!(!statement.should_filter_record(&record_for(&statement, row(1, json!(100)))));
    assert!(!statement.should_filter_record(&record_for(&statement, row(2, json!(200)))));
    assert!(statement.should_filter_record(&record_for(&statement, row(3, json!(99)))));
    assert!(statement.should_filter_record(&record_for(&statement, row(4, json!(201)))));
    assert!(statement.should_filter_record(&record_for(&statement, row(5, Value::Null))));
}

#[test]
fn test_invalid_key_is_filtered_and_not_bindable() {
    let statement = OriginSelectStatement::build(&origin(), &MigrationProperties::default()).unwrap();
    let invalid = record_for(&statement, vec![Value::Null, json!("a"), json!("b")]);
    assert!(invalid.pk().is_error());
    assert!(statement.should_filter_record(&invalid));
    assert!(statement.bind_pk(invalid.pk()).is_err());

    let bound = statement
        .bind_pk(&PrimaryKey::for_values(vec![json!(5)]))
        .unwrap();
    assert_eq!(bound.binding, Binding::PrimaryKey(vec![json!(5)]));
    assert!(statement
        .bind_pk(&PrimaryKey::for_values(vec![json!(5), json!(6)]))
        .is_err());
}
