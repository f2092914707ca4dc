use crate::data::primary_key::PrimaryKey;
use crate::data::record::Record;
use crate::data::value_codec::convert_value;
use crate::error::{MigrationError, MigrationResult};
use crate::feature::{ConstantColumns, ExplodeMap};
use crate::table_types::{ColumnType, DataRow, TableSchema};
use serde_json::Value;

/// Where a target column's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    Origin(usize),
    Constant(Value),
    ExplodeKey,
    ExplodeValue,
}

impl ColumnSource {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnSource::Origin(_) => "origin",
            ColumnSource::Constant(_) => "constant",
            ColumnSource::ExplodeKey => "explode_key",
            ColumnSource::ExplodeValue => "explode_value",
        }
    }
}

/// Job-lifetime mapping from every target column index to its source.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    target_names: Vec<String>,
    target_types: Vec<ColumnType>,
    origin_names: Vec<String>,
    origin_types: Vec<ColumnType>,
    sources: Vec<ColumnSource>,
    explode_key_type: Option<ColumnType>,
    explode_value_type: Option<ColumnType>,
}

impl ColumnMapping {
    pub fn build(
        origin: &TableSchema,
        target: &TableSchema,
        constants: &ConstantColumns,
        explode: Option<&ExplodeMap>,
    ) -> MigrationResult<Self> {
        let mut sources = Vec::with_capacity(target.columns.len());

        for (target_index, column) in target.columns.iter().enumerate() {
            let source = if let Some(value) = constants.value_for_index(target_index) {
                ColumnSource::Constant(value.clone())
            } else if let Some(origin_index) = origin.index_of(&column.name) {
                ColumnSource::Origin(origin_index)
            } else if explode.is_some_and(|e| e.key_target_index() == target_index) {
                ColumnSource::ExplodeKey
            } else if explode.is_some_and(|e| e.value_target_index() == target_index) {
                ColumnSource::ExplodeValue
            } else {
                return Err(MigrationError::Config(format!(
                    "Target column \"{}\" at index {} cannot be found on Origin, and is neither a constant column (indexes:{:?}) nor an explode map column (keyIndex:{}, valueIndex:{})",
                    column.name,
                    target_index,
                    constants.indexes(),
                    explode.map(|e| e.key_target_index() as i64).unwrap_or(-1),
                    explode.map(|e| e.value_target_index() as i64).unwrap_or(-1),
                )));
            };
            sources.push(source);
        }

        Ok(Self {
            target_names: target.column_names(),
            target_types: target.column_types(),
            origin_names: origin.column_names(),
            origin_types: origin.column_types(),
            sources,
            explode_key_type: explode.map(|e| e.key_type().clone()),
            explode_value_type: explode.map(|e| e.value_type().clone()),
        })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[ColumnSource] {
        &self.sources
    }

    pub fn source(&self, target_index: usize) -> Option<&ColumnSource> {
        self.sources.get(target_index)
    }

    pub fn target_name(&self, target_index: usize) -> &str {
        self.target_names
            .get(target_index)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn target_type(&self, target_index: usize) -> Option<&ColumnType> {
        self.target_types.get(target_index)
    }

    pub fn origin_index(&self, target_index: usize) -> Option<usize> {
        match self.sources.get(target_index) {
            Some(ColumnSource::Origin(origin_index)) => Some(*origin_index),
            _ => None,
        }
    }

    pub fn origin_name(&self, origin_index: usize) -> Option<&str> {
        self.origin_names.get(origin_index).map(String::as_str)
    }

    pub fn origin_type(&self, origin_index: usize) -> Option<&ColumnType> {
        self.origin_types.get(origin_index)
    }

    /// The origin-side type a target value is converted to before comparing.
    /// Constant columns have none.
    pub fn comparison_type(&self, target_index: usize) -> Option<&ColumnType> {
        match self.sources.get(target_index)? {
            ColumnSource::Origin(origin_index) => self.origin_types.get(*origin_index),
            ColumnSource::ExplodeKey => self.explode_key_type.as_ref(),
            ColumnSource::ExplodeValue => self.explode_value_type.as_ref(),
            ColumnSource::Constant(_) => None,
        }
    }

    /// Target-typed value for one target column, taken from the origin row,
    /// the constant, or the explode slot carried on the key.
    pub fn target_value(
        &self,
        target_index: usize,
        origin_row: &DataRow,
        pk: &PrimaryKey,
    ) -> Result<Value, String> {
        let target_type = self
            .target_types
            .get(target_index)
            .ok_or_else(|| format!("No target column at index {}", target_index))?;
        let source = self
            .sources
            .get(target_index)
            .ok_or_else(|| format!("No mapping for target column index {}", target_index))?;

        match source {
            ColumnSource::Origin(origin_index) => {
                let value = origin_row.get(*origin_index).ok_or_else(|| {
                    format!("Origin row has no column at index {}", origin_index)
                })?;
                convert_value(value, &self.origin_types[*origin_index], target_type)
            }
            ColumnSource::Constant(value) => Ok(value.clone()),
            ColumnSource::ExplodeKey => {
                let key = pk
                    .explode_map_key()
                    .ok_or_else(|| format!("Explode map key is not set on key {}", pk))?;
                let key_type = self
                    .explode_key_type
                    .as_ref()
                    .ok_or_else(|| "Explode map is not configured".to_string())?;
                convert_value(key, key_type, target_type)
            }
            ColumnSource::ExplodeValue => {
                let value = pk
                    .explode_map_value()
                    .ok_or_else(|| format!("Explode map value is not set on key {}", pk))?;
                let value_type = self
                    .explode_value_type
                    .as_ref()
                    .ok_or_else(|| "Explode map is not configured".to_string())?;
                convert_value(value, value_type, target_type)
            }
        }
    }

    /// Full target-shaped row image for a record.
    pub fn target_values(&self, record: &Record) -> Result<DataRow, String> {
        (0..self.sources.len())
            .map(|target_index| self.target_value(target_index, record.origin_row(), record.pk()))
            .collect()
    }
}

#[cfg(test)]
mod tests;
