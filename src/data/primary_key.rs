// =====================================================
// PRIMARY KEY CODEC
// Canonical keys built from rows or serialized key strings
// =====================================================

use crate::data::column_mapping::{ColumnMapping, ColumnSource};
use crate::data::record::Record;
use crate::data::value_codec::{convert_value, parser_for, value_to_text, ValueParser};
use crate::error::{MigrationError, MigrationResult};
use crate::feature::ExplodeMap;
use crate::statement::origin_select::WriteMetadataProjections;
use crate::table_types::{ColumnType, DataRow, TableSchema};
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Separator between fields of a serialized primary key.
pub const PK_FIELD_SEPARATOR: &str = " %% ";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PkState {
    #[default]
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkSide {
    Origin,
    Target,
}

/// Immutable key tuple. Equality and hashing only look at the values, so
/// keys built from an origin row and from a target row meet in a map.
#[derive(Debug, Clone)]
pub struct PrimaryKey {
    values: Vec<Value>,
    key_token: String,
    state: PkState,
    messages: Vec<String>,
    write_timestamp: Option<i64>,
    ttl: Option<i32>,
    explode_map_key: Option<Value>,
    explode_map_value: Option<Value>,
}

impl PrimaryKey {
    fn build(values: Vec<Value>, state: PkState, messages: Vec<String>) -> Self {
        let key_token = Value::Array(values.clone()).to_string();
        Self {
            values,
            key_token,
            state,
            messages,
            write_timestamp: None,
            ttl: None,
            explode_map_key: None,
            explode_map_value: None,
        }
    }

    /// A valid key over already-typed values.
    pub fn for_values(values: Vec<Value>) -> Self {
        Self::build(values, PkState::Ok, Vec::new())
    }

    fn with_write_metadata(mut self, write_timestamp: Option<i64>, ttl: Option<i32>) -> Self {
        self.write_timestamp = write_timestamp;
        self.ttl = ttl;
        self
    }

    fn exploded(&self, key_position: usize, target_key: Value, map_key: Value, map_value: Value) -> Self {
        let mut values = self.values.clone();
        if let Some(slot) = values.get_mut(key_position) {
            *slot = target_key;
        }
        let mut exploded = Self::build(values, self.state, self.messages.clone());
        exploded.write_timestamp = self.write_timestamp;
        exploded.ttl = self.ttl;
        exploded.explode_map_key = Some(map_key);
        exploded.explode_map_value = Some(map_value);
        exploded
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn state(&self) -> PkState {
        self.state
    }

    pub fn is_error(&self) -> bool {
        self.state == PkState::Error
    }

    pub fn is_warning(&self) -> bool {
        self.state == PkState::Warning
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn write_timestamp(&self) -> Option<i64> {
        self.write_timestamp
    }

    pub fn ttl(&self) -> Option<i32> {
        self.ttl
    }

    pub fn explode_map_key(&self) -> Option<&Value> {
        self.explode_map_key.as_ref()
    }

    pub fn explode_map_value(&self) -> Option<&Value> {
        self.explode_map_value.as_ref()
    }

    /// Fields joined with [`PK_FIELD_SEPARATOR`], in key column order.
    pub fn serialize(&self) -> String {
        self.values
            .iter()
            .map(value_to_text)
            .collect::<Vec<String>>()
            .join(PK_FIELD_SEPARATOR)
    }
}

impl PartialEq for PrimaryKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_token == other.key_token
    }
}

impl Eq for PrimaryKey {}

impl Hash for PrimaryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_token.hash(state);
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[derive(Debug, Clone)]
struct OriginKeyColumn {
    name: String,
    column_type: ColumnType,
    parser: ValueParser,
}

#[derive(Debug, Clone)]
struct TargetKeyColumn {
    name: String,
    column_type: ColumnType,
    target_index: usize,
    source: ColumnSource,
}

/// Builds keys for both sides. Origin-side rows are mapped into the
/// target's key shape so both sides share one canonical form; decoded key
/// strings stay in the origin's key order, ready to bind an origin lookup.
#[derive(Debug, Clone)]
pub struct PkFactory {
    origin_key: Vec<OriginKeyColumn>,
    target_key: Vec<TargetKeyColumn>,
    mapping: Arc<ColumnMapping>,
    explode: Option<Arc<ExplodeMap>>,
    explode_key_position: Option<usize>,
    write_metadata: WriteMetadataProjections,
    null_timestamp_default: Option<i64>,
}

impl PkFactory {
    pub fn new(
        origin: &TableSchema,
        target: &TableSchema,
        mapping: Arc<ColumnMapping>,
        explode: Option<Arc<ExplodeMap>>,
        write_metadata: WriteMetadataProjections,
        null_timestamp_default: Option<i64>,
    ) -> MigrationResult<Self> {
        let mut origin_key = Vec::new();
        for origin_index in origin.primary_key_indexes() {
            let column = &origin.columns[origin_index];
            let parser = parser_for(&column.column_type).map_err(|e| {
                MigrationError::Config(format!(
                    "Origin primary key column '{}' cannot be decoded from text: {}",
                    column.name, e
                ))
            })?;
            origin_key.push(OriginKeyColumn {
                name: column.name.clone(),
                column_type: column.column_type.clone(),
                parser,
            });
        }

        let mut target_key = Vec::new();
        let mut explode_key_position = None;
        for (position, target_index) in target.primary_key_indexes().into_iter().enumerate() {
            let column = &target.columns[target_index];
            let source = mapping.source(target_index).cloned().ok_or_else(|| {
                MigrationError::Config(format!(
                    "Target primary key column '{}' has no mapping",
                    column.name
                ))
            })?;
            match source {
                ColumnSource::ExplodeValue => {
                    return Err(MigrationError::Config(format!(
                        "Explode map value column '{}' cannot be part of the target primary key",
                        column.name
                    )))
                }
                ColumnSource::ExplodeKey => explode_key_position = Some(position),
                _ => {}
            }
            target_key.push(TargetKeyColumn {
                name: column.name.clone(),
                column_type: column.column_type.clone(),
                target_index,
                source,
            });
        }

        if explode.is_some() && explode_key_position.is_none() {
            return Err(MigrationError::Config(
                "Explode map key column must be part of the target primary key".to_string(),
            ));
        }

        Ok(Self {
            origin_key,
            target_key,
            mapping,
            explode,
            explode_key_position,
            write_metadata,
            null_timestamp_default,
        })
    }

    pub fn origin_key_names(&self) -> Vec<String> {
        self.origin_key.iter().map(|c| c.name.clone()).collect()
    }

    pub fn origin_key_types(&self) -> Vec<ColumnType> {
        self.origin_key.iter().map(|c| c.column_type.clone()).collect()
    }

    pub fn target_key_names(&self) -> Vec<String> {
        self.target_key.iter().map(|c| c.name.clone()).collect()
    }

    /// Decodes positional raw field values with the origin key's parsers.
    /// Problems are reported on the returned key, never as an `Err`.
    pub fn decode(&self, raw_values: &[&str]) -> PrimaryKey {
        if raw_values.len() != self.origin_key.len() {
            return PrimaryKey::build(
                raw_values
                    .iter()
                    .map(|raw| Value::String(raw.to_string()))
                    .collect(),
                PkState::Error,
                vec![format!(
                    "Expected {} primary key field(s) ({}), found {}",
                    self.origin_key.len(),
                    self.origin_key_names().join(", "),
                    raw_values.len()
                )],
            );
        }

        let mut values = Vec::with_capacity(raw_values.len());
        let mut messages = Vec::new();
        for (column, raw) in self.origin_key.iter().zip(raw_values.iter()) {
            match (column.parser)(raw) {
                Ok(value) => values.push(value),
                Err(e) => {
                    messages.push(format!("Field {} ({}): {}", column.name, column.column_type, e));
                    values.push(Value::String(raw.to_string()));
                }
            }
        }

        let types = self.origin_key_types();
        let names = self.origin_key_names();
        self.validate(values, messages, &names, &types, None)
    }

    pub fn decode_serialized(&self, serialized: &str) -> PrimaryKey {
        let fields = serialized.split(PK_FIELD_SEPARATOR).collect::<Vec<&str>>();
        self.decode(&fields)
    }

    pub fn serialize(&self, pk: &PrimaryKey) -> String {
        pk.serialize()
    }

    /// Canonical (target-shaped) key for a row read from either side.
    pub fn from_row(&self, row: &DataRow, side: PkSide) -> PrimaryKey {
        let names = self.target_key_names();
        let types = self
            .target_key
            .iter()
            .map(|c| c.column_type.clone())
            .collect::<Vec<ColumnType>>();

        match side {
            PkSide::Target => {
                let values = self
                    .target_key
                    .iter()
                    .map(|column| row.get(column.target_index).cloned().unwrap_or(Value::Null))
                    .collect();
                self.validate(values, Vec::new(), &names, &types, None)
            }
            PkSide::Origin => {
                let mut values = Vec::with_capacity(self.target_key.len());
                let mut messages = Vec::new();
                for column in &self.target_key {
                    let value = match &column.source {
                        ColumnSource::Origin(origin_index) => {
                            let raw = row.get(*origin_index).cloned().unwrap_or(Value::Null);
                            let origin_type = self.mapping.origin_type(*origin_index);
                            match origin_type {
                                Some(origin_type) => {
                                    convert_value(&raw, origin_type, &column.column_type)
                                        .unwrap_or_else(|e| {
                                            messages.push(format!(
                                                "Key column {}: {}",
                                                column.name, e
                                            ));
                                            raw
                                        })
                                }
                                None => {
                                    messages.push(format!(
                                        "Key column {}: origin index {} is out of range",
                                        column.name, origin_index
                                    ));
                                    Value::Null
                                }
                            }
                        }
                        ColumnSource::Constant(value) => value.clone(),
                        ColumnSource::ExplodeKey | ColumnSource::ExplodeValue => Value::Null,
                    };
                    values.push(value);
                }
                self.validate(values, messages, &names, &types, self.explode_key_position)
                    .with_write_metadata(
                        self.write_metadata.largest_write_timestamp(row),
                        self.write_metadata.largest_ttl(row),
                    )
            }
        }
    }

    fn validate(
        &self,
        mut values: Vec<Value>,
        mut messages: Vec<String>,
        names: &[String],
        types: &[ColumnType],
        deferred_position: Option<usize>,
    ) -> PrimaryKey {
        let mut state = if messages.is_empty() {
            PkState::Ok
        } else {
            PkState::Error
        };

        for (position, value) in values.iter_mut().enumerate() {
            if !value.is_null() || deferred_position == Some(position) {
                continue;
            }
            let name = names.get(position).map(String::as_str).unwrap_or("?");
            match (types.get(position), self.null_timestamp_default) {
                (Some(ColumnType::Timestamp), Some(default)) => {
                    *value = Value::Number(Number::from(default));
                    messages.push(format!(
                        "Null value for timestamp key column {} replaced with {}",
                        name, default
                    ));
                    state = state.max(PkState::Warning);
                }
                _ => {
                    messages.push(format!("Null value for primary key column {}", name));
                    state = PkState::Error;
                }
            }
        }

        PrimaryKey::build(values, state, messages)
    }

    /// Expands a record into the records written to the target: one per map
    /// entry when a map column is exploded, otherwise the record itself.
    /// `Err` when the map cell cannot be exploded; no partial list is
    /// returned, so the caller accounts for the origin row once.
    pub fn to_valid_record_list(&self, record: Record) -> Result<Vec<Record>, String> {
        let (Some(explode), Some(key_position)) = (&self.explode, self.explode_key_position)
        else {
            return Ok(vec![record]);
        };
        if record.pk().is_error() {
            return Ok(vec![record]);
        }

        let map_value = record
            .origin_row()
            .get(explode.origin_index())
            .cloned()
            .unwrap_or(Value::Null);
        let entries = explode
            .entries(&map_value)
            .map_err(|e| format!("Could not explode map for key {}: {}", record.pk(), e))?;

        let key_type = &self.target_key[key_position].column_type;
        entries
            .into_iter()
            .map(|(map_key, map_value)| {
                let target_key = convert_value(&map_key, explode.key_type(), key_type)
                    .map_err(|e| {
                        format!(
                            "Could not convert explode map key {} for key {}: {}",
                            map_key,
                            record.pk(),
                            e
                        )
                    })?;
                Ok(record.with_pk(record.pk().exploded(
                    key_position,
                    target_key,
                    map_key,
                    map_value,
                )))
            })
            .collect()
    }
}
