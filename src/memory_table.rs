// =====================================================
// IN-MEMORY TABLE SESSION
// Token-ordered rows with per-row write metadata and fault injection
// =====================================================

use crate::statement::{Binding, BoundSelect, BoundWrite, Projection, TableSession, WriteMode};
use crate::table_types::{ColumnType, DataRow, TableSchema};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredRow {
    values: DataRow,
    write_time: i64,
    ttl: Option<i32>,
}

/// A [`TableSession`] over rows held in memory, ordered by partition token.
/// Tokens come from a SHA-256 of the partition key values, so they spread
/// over the whole signed 64-bit token space.
pub struct MemoryTable {
    schema: TableSchema,
    key_indexes: Vec<usize>,
    partition_indexes: Vec<usize>,
    rows: Mutex<BTreeMap<(i128, String), StoredRow>>,
    clock: AtomicI64,
    writes: AtomicU64,
    range_reads: AtomicU64,
    failing_range_reads: AtomicU32,
    failing_writes: AtomicU32,
}

impl MemoryTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            key_indexes: schema.primary_key_indexes(),
            partition_indexes: schema.partition_key_indexes(),
            schema,
            rows: Mutex::new(BTreeMap::new()),
            clock: AtomicI64::new(1),
            writes: AtomicU64::new(0),
            range_reads: AtomicU64::new(0),
            failing_range_reads: AtomicU32::new(0),
            failing_writes: AtomicU32::new(0),
        }
    }

    /// Token of the partition holding `row` (a full row in schema order).
    pub fn token_of(&self, row: &DataRow) -> i128 {
        let partition_values = self
            .partition_indexes
            .iter()
            .map(|index| row.get(*index).cloned().unwrap_or(Value::Null))
            .collect::<Vec<Value>>();
        let digest = Sha256::digest(Value::Array(partition_values).to_string().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(prefix) as i128
    }

    fn key_token(&self, key_values: &[Value]) -> String {
        Value::Array(key_values.to_vec()).to_string()
    }

    fn row_key(&self, row: &DataRow) -> (i128, String) {
        let key_values = self
            .key_indexes
            .iter()
            .map(|index| row.get(*index).cloned().unwrap_or(Value::Null))
            .collect::<Vec<Value>>();
        (self.token_of(row), self.key_token(&key_values))
    }

    /// Seeds a row, with optional TTL and write time.
    pub async fn insert_row(
        &self,
        values: DataRow,
        ttl: Option<i32>,
        write_time: Option<i64>,
    ) -> Result<(), String> {
        if values.len() != self.schema.columns.len() {
            return Err(format!(
                "Row has {} value(s), {} has {} column(s)",
                values.len(),
                self.schema.keyspace_table,
                self.schema.columns.len()
            ));
        }
        let write_time = write_time.unwrap_or_else(|| self.tick());
        let key = self.row_key(&values);
        self.rows.lock().await.insert(
            key,
            StoredRow {
                values,
                write_time,
                ttl,
            },
        );
        Ok(())
    }

    pub async fn insert(&self, values: DataRow) -> Result<(), String> {
        self.insert_row(values, None, None).await
    }

    pub async fn remove(&self, key_values: &[Value]) -> bool {
        let wanted = self.key_token(key_values);
        let mut rows = self.rows.lock().await;
        let found = rows.keys().find(|(_, key)| *key == wanted).cloned();
        match found {
            Some(key) => rows.remove(&key).is_some(),
            None => false,
        }
    }

    /// All rows in token order.
    pub async fn rows(&self) -> Vec<DataRow> {
        self.rows
            .lock()
            .await
            .values()
            .map(|row| row.values.clone())
            .collect()
    }

    pub async fn get(&self, key_values: &[Value]) -> Option<DataRow> {
        let wanted = self.key_token(key_values);
        self.rows
            .lock()
            .await
            .iter()
            .find(|((_, key), _)| *key == wanted)
            .map(|(_, row)| row.values.clone())
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn range_read_count(&self) -> u64 {
        self.range_reads.load(Ordering::Relaxed)
    }

    /// The next `count` range reads fail.
    pub fn fail_next_range_reads(&self, count: u32) {
        self.failing_range_reads.store(count, Ordering::SeqCst);
    }

    /// The next `count` writes fail.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    fn project(&self, stored: &StoredRow, projections: &[Projection]) -> Result<DataRow, String> {
        projections
            .iter()
            .map(|projection| match projection {
                Projection::Column(name) => {
                    let index = self.column_index(name)?;
                    Ok(stored.values[index].clone())
                }
                Projection::Ttl(name) => {
                    let index = self.column_index(name)?;
                    Ok(match (&stored.values[index], stored.ttl) {
                        (Value::Null, _) | (_, None) => Value::Null,
                        (_, Some(ttl)) => Value::Number(Number::from(ttl)),
                    })
                }
                Projection::WriteTime(name) => {
                    let index = self.column_index(name)?;
                    Ok(match &stored.values[index] {
                        Value::Null => Value::Null,
                        _ => Value::Number(Number::from(stored.write_time)),
                    })
                }
            })
            .collect()
    }

    fn column_index(&self, name: &str) -> Result<usize, String> {
        self.schema.index_of(name).ok_or_else(|| {
            format!(
                "Undefined column name {} in table {}",
                name, self.schema.keyspace_table
            )
        })
    }

    fn bound_column_indexes(&self, statement: &BoundWrite) -> Result<Vec<usize>, String> {
        if statement.columns.len() != statement.values.len() {
            return Err(format!(
                "Write binds {} column(s) but {} value(s)",
                statement.columns.len(),
                statement.values.len()
            ));
        }
        statement
            .columns
            .iter()
            .map(|name| self.column_index(name))
            .collect()
    }
}

#[async_trait::async_trait]
impl TableSession for MemoryTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn select(&self, statement: &BoundSelect) -> Result<Vec<DataRow>, String> {
        let rows = self.rows.lock().await;
        match &statement.binding {
            Binding::PartitionRange(range) => {
                self.range_reads.fetch_add(1, Ordering::Relaxed);
                if Self::take_fault(&self.failing_range_reads) {
                    return Err(format!(
                        "Injected read failure on {} for range {}",
                        self.schema.keyspace_table, range
                    ));
                }
                rows.iter()
                    .filter(|((token, _), _)| range.contains(*token))
                    .map(|(_, stored)| self.project(stored, &statement.projections))
                    .collect()
            }
            Binding::PrimaryKey(key_values) => {
                if key_values.len() != self.key_indexes.len() {
                    return Err(format!(
                        "Key binds {} value(s), {} has {} key column(s)",
                        key_values.len(),
                        self.schema.keyspace_table,
                        self.key_indexes.len()
                    ));
                }
                let wanted = self.key_token(key_values);
                rows.iter()
                    .filter(|((_, key), _)| *key == wanted)
                    .map(|(_, stored)| self.project(stored, &statement.projections))
                    .collect()
            }
        }
    }

    async fn write(&self, statement: &BoundWrite) -> Result<(), String> {
        if Self::take_fault(&self.failing_writes) {
            return Err(format!(
                "Injected write failure on {}",
                self.schema.keyspace_table
            ));
        }
        let indexes = self.bound_column_indexes(statement)?;
        for key_index in &self.key_indexes {
            if !indexes.contains(key_index) {
                return Err(format!(
                    "Missing key column {} in write to {}",
                    self.schema.columns[*key_index].name, self.schema.keyspace_table
                ));
            }
        }

        let mut image = vec![Value::Null; self.schema.columns.len()];
        for (index, value) in indexes.iter().zip(statement.values.iter()) {
            image[*index] = value.clone();
        }
        let key = self.row_key(&image);
        let write_time = statement.write_timestamp.unwrap_or_else(|| self.tick());

        let mut rows = self.rows.lock().await;
        let width = image.len();
        let stored = rows.entry(key).or_insert_with(|| StoredRow {
            values: vec![Value::Null; width],
            write_time,
            ttl: None,
        });
        for (index, value) in indexes.iter().zip(statement.values.iter()) {
            let column_type = &self.schema.columns[*index].column_type;
            match (statement.mode, column_type) {
                (WriteMode::CounterIncrement, ColumnType::Counter) => {
                    let current = stored.values[*index].as_i64().unwrap_or(0);
                    let delta = value
                        .as_i64()
                        .ok_or_else(|| format!("Counter delta {} is not an integer", value))?;
                    let total = current.checked_add(delta).ok_or_else(|| {
                        format!(
                            "Counter {} overflows: {} + {}",
                            self.schema.columns[*index].name, current, delta
                        )
                    })?;
                    stored.values[*index] = Value::Number(Number::from(total));
                }
                _ => stored.values[*index] = value.clone(),
            }
        }
        stored.write_time = write_time;
        stored.ttl = statement.ttl;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
