use super::*;

#[test]
fn test_defaults_from_empty_json() {
    let properties = MigrationProperties::from_json_str("{}").unwrap();
    assert_eq!(properties.job_kind, JobKind::Diff);
    assert_eq!(properties.max_retries, 0);
    assert_eq!(properties.max_attempts(), 1);
    assert_eq!(properties.fetch_size_in_rows, 1_000);
    assert_eq!(properties.print_stats_after, 100_000);
    assert_eq!(properties.rate_limit_target_writes, 20_000);
    assert!(!properties.autocorrect_missing);
    assert!(properties.write_timestamp_window().is_none());
    assert_eq!(properties.mismatch_report_limit, 10_000);
    assert!(properties.failed_partitions_file.is_none());
}

#[test]
fn test_camel_case_fields() {
    let properties = MigrationProperties::from_json_str(
        r#"{
            "jobKind": "copyPk",
            "autocorrectMissing": true,
            "maxRetries": 2,
            "writetimeColumns": ["payload"],
            "minWriteTimestampFilter": 10,
            "constantColumns": [{"name": "region", "value": "eu"}],
            "explodeMap": {"originColumn": "attrs", "keyColumn": "attr_key", "valueColumn": "attr_value"}
        }"#,
    )
    .unwrap();

    assert_eq!(properties.job_kind, JobKind::CopyPk);
    assert!(properties.autocorrect_missing);
    assert_eq!(properties.max_attempts(), 3);
    assert_eq!(properties.write_timestamp_window(), Some((10, i64::MAX)));
    assert_eq!(properties.constant_columns[0].name, "region");
    assert_eq!(
        properties.explode_map.as_ref().map(|e| e.key_column.as_str()),
        Some("attr_key")
    );
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut properties = MigrationProperties::default();
    properties.fetch_size_in_rows = 0;
    assert!(properties.validate().is_err());

    let mut properties = MigrationProperties::default();
    properties.rate_limit_target_reads = 0;
    assert!(properties
        .validate()
        .unwrap_err()
        .contains("rateLimitTargetReads"));

    let mut properties = MigrationProperties::default();
    properties.min_write_timestamp_filter = Some(20);
    properties.max_write_timestamp_filter = Some(10);
    properties.writetime_columns = vec!["payload".to_string()];
    assert!(properties.validate().is_err());
}

#[test]
fn test_write_timestamp_filter_needs_projection() {
    let mut properties = MigrationProperties::default();
    properties.max_write_timestamp_filter = Some(10);
    assert!(properties
        .validate()
        .unwrap_err()
        .contains("writetimeColumns"));
}

#[test]
fn test_parse_error_is_config_error() {
    let err = MigrationProperties::from_json_str("{\"maxRetries\": -1}").unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_failed_partitions_path_defaults_to_origin_table() {
    let mut properties = MigrationProperties::default();
    assert_eq!(
        properties.failed_partitions_path("ks.origin"),
        PathBuf::from("ks.origin_partitions.csv")
    );

    properties.failed_partitions_file = Some(PathBuf::from("/tmp/failed.csv"));
    assert_eq!(
        properties.failed_partitions_path("ks.origin"),
        PathBuf::from("/tmp/failed.csv")
    );
}
