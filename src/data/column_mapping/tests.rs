use super::*;
use crate::properties::{ConstantColumnSpec, ExplodeMapSpec};
use crate::table_types::ColumnDef;
use serde_json::json;
use std::sync::Arc;

fn origin() -> TableSchema {
    TableSchema::new(
        "ks.origin",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("score", ColumnType::Int),
            ColumnDef::new("attrs", ColumnType::from_cql("map<int,text>").unwrap()),
        ],
        &["id"],
        &[],
    )
    .unwrap()
}

fn plain_target() -> TableSchema {
    TableSchema::new(
        "ks.target",
        vec![
            ColumnDef::new("ID", ColumnType::Int),
            ColumnDef::new("score", ColumnType::BigInt),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("region", ColumnType::Text),
        ],
        &["ID"],
        &[],
    )
    .unwrap()
}

fn exploded_target() -> TableSchema {
    TableSchema::new(
        "ks.target",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("attr_key", ColumnType::Int),
            ColumnDef::new("attr_value", ColumnType::Text),
        ],
        &["id"],
        &["attr_key"],
    )
    .unwrap()
}

fn region_constant(target: &TableSchema) -> ConstantColumns {
    ConstantColumns::build(
        &[ConstantColumnSpec {
            name: "region".to_string(),
            value: "eu".to_string(),
        }],
        target,
    )
    .unwrap()
}

fn explode(target: &TableSchema) -> ExplodeMap {
    ExplodeMap::build(
        &ExplodeMapSpec {
            origin_column: "attrs".to_string(),
            key_column: "attr_key".to_string(),
            value_column: "attr_value".to_string(),
        },
        &origin(),
        target,
    )
    .unwrap()
}

#[test]
fn test_build_resolves_sources_by_name_and_constant() {
    let target = plain_target();
    let mapping = ColumnMapping::build(&origin(), &target, &region_constant(&target), None).unwrap();

    assert_eq!(mapping.len(), 4);
    assert_eq!(mapping.source(0), Some(&ColumnSource::Origin(0)));
    assert_eq!(mapping.source(1), Some(&ColumnSource::Origin(2)));
    assert_eq!(mapping.source(2), Some(&ColumnSource::Origin(1)));
    assert_eq!(mapping.source(3), Some(&ColumnSource::Constant(json!("eu"))));
    assert_eq!(mapping.origin_index(1), Some(2));
    assert_eq!(mapping.origin_index(3), None);
    assert_eq!(mapping.comparison_type(1), Some(&ColumnType::Int));
    assert_eq!(mapping.comparison_type(3), None);
}

#[test]
fn test_build_rejects_unmapped_target_column() {
    let target = plain_target();
    let err = ColumnMapping::build(&origin(), &target, &ConstantColumns::default(), None)
        .unwrap_err();
    let message = err.to_string();
    assert!(err.is_fatal());
    assert!(message.contains("\"region\""));
    assert!(message.contains("cannot be found on Origin"));
}

#[test]
fn test_build_maps_explode_columns() {
    let target = exploded_target();
    let explode = explode(&target);
    let mapping =
        ColumnMapping::build(&origin(), &target, &ConstantColumns::default(), Some(&explode))
            .unwrap();

    assert_eq!(mapping.source(1), Some(&ColumnSource::ExplodeKey));
    assert_eq!(mapping.source(2), Some(&ColumnSource::ExplodeValue));
    assert_eq!(mapping.comparison_type(1), Some(&ColumnType::Int));
    assert_eq!(mapping.comparison_type(2), Some(&ColumnType::Text));
    assert_eq!(mapping.source(1).map(ColumnSource::label), Some("explode_key"));
}

#[test]
fn test_target_values_convert_to_target_types() {
    let target = plain_target();
    let mapping = ColumnMapping::build(&origin(), &target, &region_constant(&target), None).unwrap();
    let record = Record::new(
        PrimaryKey::for_values(vec![json!(7)]),
        Arc::new(vec![json!(7), json!("ann"), json!(42), Value::Null]),
    );

    let values = mapping.target_values(&record).unwrap();
    assert_eq!(values, vec![json!(7), json!(42), json!("ann"), json!("eu")]);
}

#[test]
fn test_explode_values_need_key_slots() {
    let target = exploded_target();
    let explode = explode(&target);
    let mapping =
        ColumnMapping::build(&origin(), &target, &ConstantColumns::default(), Some(&explode))
            .unwrap();
    let record = Record::new(
        PrimaryKey::for_values(vec![json!(7), Value::Null]),
        Arc::new(vec![json!(7), json!("ann"), json!(1), json!({"3": "c"})]),
    );

    let err = mapping.target_value(1, record.origin_row(), record.pk()).unwrap_err();
    assert!(err.contains("Explode map key is not set"));
    assert_eq!(mapping.target_value(0, record.origin_row(), record.pk()).unwrap(), json!(7));
}
