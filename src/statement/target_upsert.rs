use crate::data::{ColumnMapping, Record};
use crate::statement::key_clause;
use crate::statement::origin_select::WriteMetadataProjections;
use crate::statement::session::{BoundWrite, TableSession, WriteMode};
use crate::table_types::{ColumnType, TableSchema};
use serde_json::{Number, Value};
use std::sync::Arc;

/// Target write: a full row image, or counter deltas for counter tables.
#[derive(Debug, Clone)]
pub struct TargetUpsertStatement {
    mapping: Arc<ColumnMapping>,
    column_names: Vec<String>,
    counter_indexes: Vec<usize>,
    key_indexes: Vec<usize>,
    use_ttl: bool,
    use_write_timestamp: bool,
    cql: String,
}

impl TargetUpsertStatement {
    pub fn build(
        target: &TableSchema,
        mapping: Arc<ColumnMapping>,
        write_metadata: &WriteMetadataProjections,
    ) -> Self {
        let column_names = target.column_names();
        let key_indexes = target.primary_key_indexes();
        let counter_indexes = target
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.column_type == ColumnType::Counter)
            .map(|(index, _)| index)
            .collect::<Vec<usize>>();
        let is_counter = !counter_indexes.is_empty();
        let use_ttl = !is_counter && write_metadata.has_ttls();
        let use_write_timestamp = !is_counter && write_metadata.has_write_timestamps();

        let cql = if is_counter {
            let assignments = counter_indexes
                .iter()
                .map(|index| format!("{}={}+?", column_names[*index], column_names[*index]))
                .collect::<Vec<String>>()
                .join(",");
            format!(
                "UPDATE {} SET {} WHERE {}",
                target.keyspace_table,
                assignments,
                key_clause(&target.primary_key_columns())
            )
        } else {
            let mut cql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                target.keyspace_table,
                column_names.join(","),
                vec!["?"; column_names.len()].join(",")
            );
            match (use_ttl, use_write_timestamp) {
                (true, true) => cql.push_str(" USING TTL ? AND TIMESTAMP ?"),
                (true, false) => cql.push_str(" USING TTL ?"),
                (false, true) => cql.push_str(" USING TIMESTAMP ?"),
                (false, false) => {}
            }
            cql
        };

        Self {
            mapping,
            column_names,
            counter_indexes,
            key_indexes,
            use_ttl,
            use_write_timestamp,
            cql,
        }
    }

    pub fn cql(&self) -> &str {
        &self.cql
    }

    pub fn is_counter(&self) -> bool {
        !self.counter_indexes.is_empty()
    }

    pub fn bind_record(&self, record: &Record) -> Result<BoundWrite, String> {
        if record.pk().is_error() {
            return Err(format!("Cannot write key {} in error state", record.pk()));
        }
        let values = self.mapping.target_values(record)?;

        if !self.is_counter() {
            return Ok(BoundWrite {
                cql: self.cql.clone(),
                columns: self.column_names.clone(),
                values,
                mode: WriteMode::Upsert,
                ttl: if self.use_ttl { record.pk().ttl() } else { None },
                write_timestamp: if self.use_write_timestamp {
                    record.pk().write_timestamp()
                } else {
                    None
                },
            });
        }

        let mut columns = Vec::with_capacity(self.counter_indexes.len() + self.key_indexes.len());
        let mut bound_values = Vec::with_capacity(columns.capacity());
        for index in &self.counter_indexes {
            let origin = counter_value(values.get(*index))?;
            let target = counter_value(record.target_row().and_then(|row| row.get(*index)))?;
            let delta = origin.checked_sub(target).ok_or_else(|| {
                format!(
                    "Counter delta for {} overflows: {} - {}",
                    self.column_names[*index], origin, target
                )
            })?;
            columns.push(self.column_names[*index].clone());
            bound_values.push(Value::Number(Number::from(delta)));
        }
        for index in &self.key_indexes {
            columns.push(self.column_names[*index].clone());
            bound_values.push(values.get(*index).cloned().unwrap_or(Value::Null));
        }

        Ok(BoundWrite {
            cql: self.cql.clone(),
            columns,
            values: bound_values,
            mode: WriteMode::CounterIncrement,
            ttl: None,
            write_timestamp: None,
        })
    }

    pub async fn put_record(&self, session: &dyn TableSession, record: &Record) -> Result<(), String> {
        let bound = self.bind_record(record)?;
        session.write(&bound).await
    }
}

fn counter_value(value: Option<&Value>) -> Result<i64, String> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| format!("Counter value {} is not an integer", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PrimaryKey;
    use crate::feature::ConstantColumns;
    use crate::table_types::ColumnDef;
    use serde_json::json;

    fn counters() -> TableSchema {
        TableSchema::new(
            "ks.hits",
            vec![
                ColumnDef::new("page", ColumnType::Text),
                ColumnDef::new("views", ColumnType::Counter),
            ],
            &["page"],
            &[],
        )
        .unwrap()
    }

    fn users() -> TableSchema {
        TableSchema::new(
            "ks.users",
            vec![
                ColumnDef::new("id", ColumnType::Int),
                ColumnDef::new("name", ColumnType::Text),
            ],
            &["id"],
            &[],
        )
        .unwrap()
    }

    fn statement(schema: &TableSchema, metadata: &WriteMetadataProjections) -> TargetUpsertStatement {
        let mapping =
            ColumnMapping::build(schema, schema, &ConstantColumns::default(), None).unwrap();
        TargetUpsertStatement::build(schema, Arc::new(mapping), metadata)
    }

    #[test]
    fn test_upsert_cql_and_values() {
        let upsert = statement(&users(), &WriteMetadataProjections::default());
        assert_eq!(upsert.cql(), "INSERT INTO ks.users (id,name) VALUES (?,?)");

        let record = Record::new(
            PrimaryKey::for_values(vec![json!(1)]),
            Arc::new(vec![json!(1), json!("ann")]),
        );
        let bound = upsert.bind_record(&record).unwrap();
        assert_eq!(bound.mode, WriteMode::Upsert);
        assert_eq!(bound.values, vec![json!(1), json!("ann")]);
        assert_eq!(bound.ttl, None);
    }

    #[test]
    fn test_upsert_uses_ttl_and_timestamp_clause() {
        let metadata = WriteMetadataProjections::new(vec![2], vec![3]);
        let upsert = statement(&users(), &metadata);
        assert!(upsert.cql().ends_with("USING TTL ? AND TIMESTAMP ?"));
    }

    #[test]
    fn test_counter_delta_against_target() {
        let upsert = statement(&counters(), &WriteMetadataProjections::default());
        assert!(upsert.is_counter());
        assert_eq!(
            upsert.cql(),
            "UPDATE ks.hits SET views=views+? WHERE page=?"
        );

        let mut record = Record::new(
            PrimaryKey::for_values(vec![json!("home")]),
            Arc::new(vec![json!("home"), json!(10)]),
        );
        record
            .set_target_row(Some(vec![json!("home"), json!(4)]))
            .unwrap();
        let bound = upsert.bind_record(&record).unwrap();
        assert_eq!(bound.mode, WriteMode::CounterIncrement);
        assert_eq!(bound.columns, vec!["views".to_string(), "page".to_string()]);
        assert_eq!(bound.values, vec![json!(6), json!("home")]);

        let missing = Record::new(
            PrimaryKey::for_values(vec![json!("home")]),
            Arc::new(vec![json!("home"), json!(10)]),
        );
        assert_eq!(upsert.bind_record(&missing).unwrap().values[0], json!(10));
    }

    #[test]
    fn test_counter_delta_overflow_is_an_error() {
        let upsert = statement(&counters(), &WriteMetadataProjections::default());
        let mut record = Record::new(
            PrimaryKey::for_values(vec![json!("home")]),
            Arc::new(vec![json!("home"), json!(i64::MAX)]),
        );
        record
            .set_target_row(Some(vec![json!("home"), json!(-1)]))
            .unwrap();

        let err = upsert.bind_record(&record).unwrap_err();
        assert!(err.contains("views overflows"));
    }
}
