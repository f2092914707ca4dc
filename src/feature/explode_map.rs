use crate::data::value_codec::{parser_for, ValueParser};
use crate::error::{MigrationError, MigrationResult};
use crate::properties::ExplodeMapSpec;
use crate::table_types::{ColumnType, TableSchema};
use serde_json::Value;

/// Fans one map-valued origin column out into one target row per entry.
/// The target gets a key column and a value column in place of the map.
#[derive(Debug, Clone)]
pub struct ExplodeMap {
    origin_column_name: String,
    origin_index: usize,
    key_type: ColumnType,
    value_type: ColumnType,
    key_parser: ValueParser,
    key_column_name: String,
    key_target_index: usize,
    value_column_name: String,
    value_target_index: usize,
}

impl ExplodeMap {
    pub fn build(
        spec: &ExplodeMapSpec,
        origin: &TableSchema,
        target: &TableSchema,
    ) -> MigrationResult<Self> {
        let origin_index = origin.index_of(&spec.origin_column).ok_or_else(|| {
            MigrationError::Config(format!(
                "Explode map column '{}' is not a column of origin table {}",
                spec.origin_column, origin.keyspace_table
            ))
        })?;
        let (key_type, value_type) = match &origin.columns[origin_index].column_type {
            ColumnType::Map(key, value) => ((**key).clone(), (**value).clone()),
            other => {
                return Err(MigrationError::Config(format!(
                    "Explode map column '{}' has type {}, expected a map",
                    spec.origin_column, other
                )))
            }
        };
        let key_parser = parser_for(&key_type).map_err(MigrationError::Config)?;

        let key_target_index = target.index_of(&spec.key_column).ok_or_else(|| {
            MigrationError::Config(format!(
                "Explode map key column '{}' is not a column of target table {}",
                spec.key_column, target.keyspace_table
            ))
        })?;
        let value_target_index = target.index_of(&spec.value_column).ok_or_else(|| {
            MigrationError::Config(format!(
                "Explode map value column '{}' is not a column of target table {}",
                spec.value_column, target.keyspace_table
            ))
        })?;
        if key_target_index == value_target_index {
            return Err(MigrationError::Config(
                "Explode map key and value columns must differ".to_string(),
            ));
        }

        log::debug!(
            "Explode Map KeyIndex={}, ValueIndex={}",
            key_target_index,
            value_target_index
        );

        Ok(Self {
            origin_column_name: origin.columns[origin_index].name.clone(),
            origin_index,
            key_type,
            value_type,
            key_parser,
            key_column_name: target.columns[key_target_index].name.clone(),
            key_target_index,
            value_column_name: target.columns[value_target_index].name.clone(),
            value_target_index,
        })
    }

    pub fn origin_column_name(&self) -> &str {
        &self.origin_column_name
    }

    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    pub fn key_type(&self) -> &ColumnType {
        &self.key_type
    }

    pub fn value_type(&self) -> &ColumnType {
        &self.value_type
    }

    pub fn key_column_name(&self) -> &str {
        &self.key_column_name
    }

    pub fn key_target_index(&self) -> usize {
        self.key_target_index
    }

    pub fn value_column_name(&self) -> &str {
        &self.value_column_name
    }

    pub fn value_target_index(&self) -> usize {
        self.value_target_index
    }

    /// Typed `(key, value)` pairs of a map cell. A null map has no entries.
    pub fn entries(&self, map_value: &Value) -> Result<Vec<(Value, Value)>, String> {
        match map_value {
            Value::Null => Ok(Vec::new()),
            Value::Object(entries) => entries
                .iter()
                .map(|(key, value)| {
                    let typed_key = (self.key_parser)(key).map_err(|e| {
                        format!(
                            "Explode map column '{}' has an unparseable key: {}",
                            self.origin_column_name, e
                        )
                    })?;
                    Ok((typed_key, value.clone()))
                })
                .collect(),
            other => Err(format!(
                "Explode map column '{}' does not hold a map: {}",
                self.origin_column_name, other
            )),
        }
    }
}
