use super::*;
use serde_json::json;

#[test]
fn test_parser_registry_covers_scalars() {
    for cql in [
        "ascii", "text", "int", "bigint", "smallint", "tinyint", "varint", "counter", "float",
        "double", "decimal", "boolean", "uuid", "timeuuid", "timestamp", "date", "time", "blob",
        "inet",
    ] {
        let column_type = ColumnType::from_cql(cql).unwrap();
        assert!(parser_for(&column_type).is_ok(), "missing parser for {}", cql);
    }
    assert!(parser_for(&ColumnType::from_cql("list<int>").unwrap()).is_err());
}

#[test]
fn test_parse_scalars() {
    assert_eq!(parse_value(&ColumnType::Int, "100").unwrap(), json!(100));
    assert!(parse_value(&ColumnType::Int, "3000000000").is_err());
    assert!(parse_value(&ColumnType::TinyInt, "128").is_err());
    assert_eq!(parse_value(&ColumnType::Boolean, "TRUE").unwrap(), json!(true));
    assert_eq!(
        parse_value(&ColumnType::Uuid, "2B7A4E8C-1B9F-4C4A-9E55-6F8D3C2E1A00").unwrap(),
        json!("2b7a4e8c-1b9f-4c4a-9e55-6f8d3c2e1a00")
    );
    assert!(parse_value(&ColumnType::Uuid, "bad-uuid").is_err());
    assert_eq!(parse_value(&ColumnType::Blob, "0xCAFE").unwrap(), json!("0xcafe"));
    assert!(parse_value(&ColumnType::Blob, "0xZZ").is_err());
    assert_eq!(parse_value(&ColumnType::Decimal, "12.50").unwrap(), json!("12.50"));
    assert!(parse_value(&ColumnType::Decimal, "12,50").is_err());
    assert_eq!(parse_value(&ColumnType::Inet, "10.0.0.1").unwrap(), json!("10.0.0.1"));
    assert_eq!(parse_value(&ColumnType::Date, "2024-02-29").unwrap(), json!("2024-02-29"));
    assert!(parse_value(&ColumnType::Date, "2023-02-29").is_err());
}

#[test]
fn test_parse_timestamp_forms() {
    assert_eq!(
        parse_value(&ColumnType::Timestamp, "1700000000000").unwrap(),
        json!(1_700_000_000_000i64)
    );
    assert_eq!(
        parse_value(&ColumnType::Timestamp, "2023-11-14T22:13:20Z").unwrap(),
        json!(1_700_000_000_000i64)
    );
    assert_eq!(
        parse_value(&ColumnType::Timestamp, "2023-11-14 22:13:20").unwrap(),
        json!(1_700_000_000_000i64)
    );
    assert!(parse_value(&ColumnType::Timestamp, "yesterday").is_err());
}

#[test]
fn test_timeuuid_requires_version_one() {
    assert!(parse_value(&ColumnType::TimeUuid, "2b7a4e8c-1b9f-4c4a-9e55-6f8d3c2e1a00").is_err());
    assert!(parse_value(&ColumnType::TimeUuid, "5b6962dd-3f90-11ef-a8a4-0242ac120002").is_ok());
}

#[test]
fn test_text_round_trip_for_key_types() {
    let samples = [
        (ColumnType::Int, "-42"),
        (ColumnType::BigInt, "9000000000"),
        (ColumnType::Text, "hello world"),
        (ColumnType::Uuid, "2b7a4e8c-1b9f-4c4a-9e55-6f8d3c2e1a00"),
        (ColumnType::Timestamp, "1700000000000"),
        (ColumnType::Boolean, "false"),
        (ColumnType::Blob, "0x00ff"),
        (ColumnType::Double, "1.5"),
        (ColumnType::Date, "2020-01-31"),
    ];
    for (column_type, text) in samples {
        let parsed = parse_value(&column_type, text).unwrap();
        let reparsed = parse_value(&column_type, &value_to_text(&parsed)).unwrap();
        assert_eq!(parsed, reparsed, "round trip failed for {}", column_type);
    }
}

#[test]
fn test_convert_between_types() {
    assert_eq!(
        convert_value(&json!("5"), &ColumnType::Text, &ColumnType::Int).unwrap(),
        json!(5)
    );
    assert_eq!(
        convert_value(&json!(5), &ColumnType::Int, &ColumnType::Text).unwrap(),
        json!("5")
    );
    assert_eq!(
        convert_value(&json!(7), &ColumnType::Int, &ColumnType::BigInt).unwrap(),
        json!(7)
    );
    assert!(convert_value(&json!(70_000), &ColumnType::Int, &ColumnType::SmallInt).is_err());
    assert_eq!(
        convert_value(&json!(3), &ColumnType::Int, &ColumnType::Double).unwrap(),
        json!(3.0)
    );
    assert!(convert_value(&json!(true), &ColumnType::Boolean, &ColumnType::Uuid).is_err());
    assert_eq!(
        convert_value(&Value::Null, &ColumnType::Boolean, &ColumnType::Uuid).unwrap(),
        Value::Null
    );
}

#[test]
fn test_convert_collections() {
    let list = json!(["1", "2"]);
    let list_text = ColumnType::List(Box::new(ColumnType::Text));
    let set_int = ColumnType::Set(Box::new(ColumnType::Int));
    assert_eq!(convert_value(&list, &list_text, &set_int).unwrap(), json!([1, 2]));

    let map = json!({"1": "a"});
    let map_int_text = ColumnType::Map(Box::new(ColumnType::Int), Box::new(ColumnType::Text));
    let map_bigint_text =
        ColumnType::Map(Box::new(ColumnType::BigInt), Box::new(ColumnType::Text));
    assert_eq!(
        convert_value(&map, &map_int_text, &map_bigint_text).unwrap(),
        json!({"1": "a"})
    );
}

#[test]
fn test_values_differ_is_type_aware() {
    let set = ColumnType::Set(Box::new(ColumnType::Int));
    assert!(!values_differ(&set, &json!([1, 2, 3]), &json!([3, 1, 2])));
    assert!(values_differ(&set, &json!([1, 2]), &json!([1, 2, 3])));

    let list = ColumnType::List(Box::new(ColumnType::Int));
    assert!(values_differ(&list, &json!([1, 2]), &json!([2, 1])));

    assert!(!values_differ(&ColumnType::Double, &json!(1), &json!(1.0)));
    assert!(values_differ(&ColumnType::Text, &json!("a"), &json!("b")));
    assert!(values_differ(&ColumnType::Text, &json!("a"), &Value::Null));
}

#[test]
fn test_format_value() {
    let set = ColumnType::Set(Box::new(ColumnType::Text));
    assert_eq!(format_value(&set, &json!(["b", "a"])), "{a,b}");
    assert_eq!(format_value(&ColumnType::Int, &Value::Null), "null");
    assert_eq!(format_value(&ColumnType::Text, &json!("x")), "x");
    let map = ColumnType::Map(Box::new(ColumnType::Text), Box::new(ColumnType::Int));
    assert_eq!(format_value(&map, &json!({"k": 1})), "{k=1}");
}
