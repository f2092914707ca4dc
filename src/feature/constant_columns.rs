use crate::data::value_codec::parse_value;
use crate::error::{MigrationError, MigrationResult};
use crate::properties::ConstantColumnSpec;
use crate::table_types::TableSchema;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantColumn {
    pub name: String,
    pub target_index: usize,
    pub value: Value,
}

/// Target columns written with a fixed value instead of an origin value.
#[derive(Debug, Clone, Default)]
pub struct ConstantColumns {
    columns: Vec<ConstantColumn>,
}

impl ConstantColumns {
    pub fn build(specs: &[ConstantColumnSpec], target: &TableSchema) -> MigrationResult<Self> {
        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            let name = spec.name.trim();
            let target_index = target.index_of(name).ok_or_else(|| {
                MigrationError::Config(format!(
                    "Constant column '{}' is not a column of target table {}",
                    name, target.keyspace_table
                ))
            })?;
            if columns
                .iter()
                .any(|existing: &ConstantColumn| existing.target_index == target_index)
            {
                return Err(MigrationError::Config(format!(
                    "Constant column '{}' is configured twice",
                    name
                )));
            }
            let column_type = &target.columns[target_index].column_type;
            let value = parse_value(column_type, &spec.value).map_err(|e| {
                MigrationError::Config(format!(
                    "Constant column '{}' value does not parse as {}: {}",
                    name, column_type, e
                ))
            })?;
            columns.push(ConstantColumn {
                name: target.columns[target_index].name.clone(),
                target_index,
                value,
            });
        }

        if !columns.is_empty() {
            log::debug!(
                "Constant Column Indexes {:?}",
                columns.iter().map(|c| c.target_index).collect::<Vec<usize>>()
            );
        }
        Ok(Self { columns })
    }

    pub fn is_enabled(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn value_for_index(&self, target_index: usize) -> Option<&Value> {
        self.columns
            .iter()
            .find(|column| column.target_index == target_index)
            .map(|column| &column.value)
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn indexes(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.target_index).collect()
    }
}
