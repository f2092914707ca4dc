use crate::data::PartitionRange;
use crate::table_types::{DataRow, TableSchema};
use serde_json::Value;

/// One output column of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Column(String),
    Ttl(String),
    WriteTime(String),
}

impl Projection {
    pub fn alias(&self) -> String {
        match self {
            Projection::Column(name) => name.clone(),
            Projection::Ttl(name) => format!("ttl_{}", name),
            Projection::WriteTime(name) => format!("writetime_{}", name),
        }
    }

    pub fn cql(&self) -> String {
        match self {
            Projection::Column(name) => name.clone(),
            Projection::Ttl(name) => format!("TTL({}) AS {}", name, self.alias()),
            Projection::WriteTime(name) => format!("WRITETIME({}) AS {}", name, self.alias()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Rows whose partition token lies in the half-open range.
    PartitionRange(PartitionRange),
    /// The single row with these key values, in the table's key column order.
    PrimaryKey(Vec<Value>),
}

#[derive(Debug, Clone)]
pub struct BoundSelect {
    pub cql: String,
    pub projections: Vec<Projection>,
    pub binding: Binding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Upsert,
    /// Values of counter columns are deltas added to the stored counters.
    CounterIncrement,
}

#[derive(Debug, Clone)]
pub struct BoundWrite {
    pub cql: String,
    pub columns: Vec<String>,
    pub values: DataRow,
    pub mode: WriteMode,
    pub ttl: Option<i32>,
    pub write_timestamp: Option<i64>,
}

/// Remote read/write against one table of one cluster.
#[async_trait::async_trait]
pub trait TableSession: Send + Sync {
    fn schema(&self) -> &TableSchema;

    /// Rows come back in projection order.
    async fn select(&self, statement: &BoundSelect) -> Result<Vec<DataRow>, String>;

    async fn write(&self, statement: &BoundWrite) -> Result<(), String>;
}
