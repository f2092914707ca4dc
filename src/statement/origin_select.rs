use crate::data::{PartitionRange, PrimaryKey, Record};
use crate::data::value_codec::value_to_text;
use crate::error::{MigrationError, MigrationResult};
use crate::properties::MigrationProperties;
use crate::statement::session::{Binding, BoundSelect, Projection, TableSession};
use crate::statement::{key_clause, token_clause};
use crate::table_types::{ColumnType, DataRow, TableSchema};
use serde_json::Value;

/// Row positions of the TTL and WRITETIME projections appended after the
/// origin's own columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteMetadataProjections {
    ttl_indexes: Vec<usize>,
    write_timestamp_indexes: Vec<usize>,
}

impl WriteMetadataProjections {
    pub fn new(ttl_indexes: Vec<usize>, write_timestamp_indexes: Vec<usize>) -> Self {
        Self {
            ttl_indexes,
            write_timestamp_indexes,
        }
    }

    pub fn has_ttls(&self) -> bool {
        !self.ttl_indexes.is_empty()
    }

    pub fn has_write_timestamps(&self) -> bool {
        !self.write_timestamp_indexes.is_empty()
    }

    /// Maximum across the write-timestamp projections; `None` when none are
    /// projected or all are null.
    pub fn largest_write_timestamp(&self, row: &DataRow) -> Option<i64> {
        self.write_timestamp_indexes
            .iter()
            .filter_map(|index| row.get(*index).and_then(Value::as_i64))
            .max()
    }

    pub fn largest_ttl(&self, row: &DataRow) -> Option<i32> {
        self.ttl_indexes
            .iter()
            .filter_map(|index| row.get(*index).and_then(Value::as_i64))
            .filter_map(|ttl| i32::try_from(ttl).ok())
            .max()
    }
}

#[derive(Debug, Clone)]
struct FilterColumn {
    name: String,
    origin_index: usize,
    value: String,
}

/// Origin reads, by partition range or by primary key, and the row filter
/// applied to everything read from the origin.
#[derive(Debug, Clone)]
pub struct OriginSelectStatement {
    keyspace_table: String,
    key_columns: Vec<String>,
    projections: Vec<Projection>,
    range_cql: String,
    pk_cql: String,
    write_metadata: WriteMetadataProjections,
    filter: Option<FilterColumn>,
    write_timestamp_window: Option<(i64, i64)>,
}

impl OriginSelectStatement {
    pub fn build(origin: &TableSchema, properties: &MigrationProperties) -> MigrationResult<Self> {
        let mut projections = origin
            .columns
            .iter()
            .map(|column| Projection::Column(column.name.clone()))
            .collect::<Vec<Projection>>();
        let key_columns = origin.primary_key_columns();

        let mut ttl_indexes = Vec::new();
        for name in &properties.ttl_columns {
            let column = resolve_metadata_column(origin, &key_columns, name, "ttlColumns")?;
            projections.push(Projection::Ttl(column));
            ttl_indexes.push(projections.len() - 1);
        }
        let mut write_timestamp_indexes = Vec::new();
        for name in &properties.writetime_columns {
            let column = resolve_metadata_column(origin, &key_columns, name, "writetimeColumns")?;
            projections.push(Projection::WriteTime(column));
            write_timestamp_indexes.push(projections.len() - 1);
        }

        let filter = match &properties.filter_column {
            Some(spec) => {
                let origin_index = origin.index_of(&spec.name).ok_or_else(|| {
                    MigrationError::Config(format!(
                        "Filter column '{}' is not a column of origin table {}",
                        spec.name, origin.keyspace_table
                    ))
                })?;
                if origin.columns[origin_index].column_type.is_collection() {
                    return Err(MigrationError::Config(format!(
                        "Filter column '{}' cannot be a collection",
                        spec.name
                    )));
                }
                Some(FilterColumn {
                    name: origin.columns[origin_index].name.clone(),
                    origin_index,
                    value: spec.value.clone(),
                })
            }
            None => None,
        };

        let select_list = projections
            .iter()
            .map(Projection::cql)
            .collect::<Vec<String>>()
            .join(",");
        let range_cql = format!(
            "SELECT {} FROM {} WHERE {}",
            select_list,
            origin.keyspace_table,
            token_clause(origin)
        );
        let pk_cql = format!(
            "SELECT {} FROM {} WHERE {}",
            select_list,
            origin.keyspace_table,
            key_clause(&key_columns)
        );

        Ok(Self {
            keyspace_table: origin.keyspace_table.clone(),
            key_columns,
            projections,
            range_cql,
            pk_cql,
            write_metadata: WriteMetadataProjections::new(ttl_indexes, write_timestamp_indexes),
            filter,
            write_timestamp_window: properties.write_timestamp_window(),
        })
    }

    pub fn range_cql(&self) -> &str {
        &self.range_cql
    }

    pub fn pk_cql(&self) -> &str {
        &self.pk_cql
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn write_metadata(&self) -> &WriteMetadataProjections {
        &self.write_metadata
    }

    pub fn bind_range(&self, range: PartitionRange) -> BoundSelect {
        BoundSelect {
            cql: self.range_cql.clone(),
            projections: self.projections.clone(),
            binding: Binding::PartitionRange(range),
        }
    }

    /// Binds a key decoded in the origin's key order.
    pub fn bind_pk(&self, pk: &PrimaryKey) -> Result<BoundSelect, String> {
        if pk.is_error() {
            return Err(format!("Cannot bind key {} in error state", pk));
        }
        if pk.values().len() != self.key_columns.len() {
            return Err(format!(
                "Key {} has {} value(s), {} expects {} ({})",
                pk,
                pk.values().len(),
                self.keyspace_table,
                self.key_columns.len(),
                self.key_columns.join(",")
            ));
        }
        Ok(BoundSelect {
            cql: self.pk_cql.clone(),
            projections: self.projections.clone(),
            binding: Binding::PrimaryKey(pk.values().to_vec()),
        })
    }

    pub async fn execute(
        &self,
        session: &dyn TableSession,
        bound: &BoundSelect,
    ) -> Result<Vec<DataRow>, String> {
        session.select(bound).await
    }

    pub fn is_record_valid(&self, record: &Record) -> bool {
        let pk = record.pk();
        if pk.is_error() {
            log::error!("PK {} is in error state: {:?}", pk, pk.messages());
            return false;
        }
        if pk.is_warning() {
            log::warn!("PK {} is in warning state: {:?}", pk, pk.messages());
        }
        true
    }

    /// True when the record must not be processed: invalid key, filter
    /// column match, or write timestamp outside the configured window.
    pub fn should_filter_record(&self, record: &Record) -> bool {
        if !self.is_record_valid(record) {
            return true;
        }

        if let Some(filter) = &self.filter {
            let cell = record
                .origin_row()
                .get(filter.origin_index)
                .map(value_to_text)
                .unwrap_or_default();
            if cell.trim().to_lowercase() == filter.value.to_lowercase() {
                log::info!("Filter Column {} removing: {}", filter.name, record.pk());
                return true;
            }
        }

        if let Some((min, max)) = self.write_timestamp_window {
            let inside = record
                .pk()
                .write_timestamp()
                .is_some_and(|write_timestamp| write_timestamp >= min && write_timestamp <= max);
            if !inside {
                log::info!("Timestamp filter removing: {}", record.pk());
                return true;
            }
        }

        false
    }

    pub fn largest_write_timestamp(&self, row: &DataRow) -> Option<i64> {
        self.write_metadata.largest_write_timestamp(row)
    }

    pub fn largest_ttl(&self, row: &DataRow) -> Option<i32> {
        self.write_metadata.largest_ttl(row)
    }
}

fn resolve_metadata_column(
    origin: &TableSchema,
    key_columns: &[String],
    name: &str,
    setting: &str,
) -> MigrationResult<String> {
    let index = origin.index_of(name).ok_or_else(|| {
        MigrationError::Config(format!(
            "{} entry '{}' is not a column of origin table {}",
            setting, name, origin.keyspace_table
        ))
    })?;
    let column = &origin.columns[index];
    if key_columns
        .iter()
        .any(|key| key.eq_ignore_ascii_case(&column.name))
    {
        return Err(MigrationError::Config(format!(
            "{} entry '{}' is a primary key column",
            setting, column.name
        )));
    }
    if column.column_type == ColumnType::Counter {
        return Err(MigrationError::Config(format!(
            "{} entry '{}' is a counter column",
            setting, column.name
        )));
    }
    Ok(column.name.clone())
}

#[cfg(test)]
mod tests;
