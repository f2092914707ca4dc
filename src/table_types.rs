// =====================================================
// COMMON TABLE TYPES AND STRUCTURES
// =====================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Positional cell values of one row, in the column order of the statement
/// that produced it.
pub type DataRow = Vec<Value>;

// --- Column Type Enum ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Ascii,
    Text,
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    Varint,
    Counter,
    Float,
    Double,
    Decimal,
    Boolean,
    Uuid,
    TimeUuid,
    Timestamp,
    Date,
    Time,
    Blob,
    Inet,
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
}

impl ColumnType {
    /// Parses a CQL type name such as `int`, `set<text>` or `map<text, bigint>`.
    pub fn from_cql(value: &str) -> Result<ColumnType, String> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err("Column type is empty".to_string());
        }

        if let Some(open) = normalized.find('<') {
            if !normalized.ends_with('>') {
                return Err(format!("Unbalanced collection type '{}'", value));
            }
            let outer = normalized[..open].trim();
            let inner = &normalized[open + 1..normalized.len() - 1];
            let args = split_type_arguments(inner)?;
            return match (outer, args.as_slice()) {
                ("list", [element]) => Ok(ColumnType::List(Box::new(ColumnType::from_cql(element)?))),
                ("set", [element]) => Ok(ColumnType::Set(Box::new(ColumnType::from_cql(element)?))),
                ("map", [key, value]) => Ok(ColumnType::Map(
                    Box::new(ColumnType::from_cql(key)?),
                    Box::new(ColumnType::from_cql(value)?),
                )),
                ("frozen", [element]) => ColumnType::from_cql(element),
                _ => Err(format!("Unsupported collection type '{}'", value)),
            };
        }

        match normalized.as_str() {
            "ascii" => Ok(ColumnType::Ascii),
            "text" | "varchar" => Ok(ColumnType::Text),
            "int" => Ok(ColumnType::Int),
            "bigint" => Ok(ColumnType::BigInt),
            "smallint" => Ok(ColumnType::SmallInt),
            "tinyint" => Ok(ColumnType::TinyInt),
            "varint" => Ok(ColumnType::Varint),
            "counter" => Ok(ColumnType::Counter),
            "float" => Ok(ColumnType::Float),
            "double" => Ok(ColumnType::Double),
            "decimal" => Ok(ColumnType::Decimal),
            "boolean" => Ok(ColumnType::Boolean),
            "uuid" => Ok(ColumnType::Uuid),
            "timeuuid" => Ok(ColumnType::TimeUuid),
            "timestamp" => Ok(ColumnType::Timestamp),
            "date" => Ok(ColumnType::Date),
            "time" => Ok(ColumnType::Time),
            "blob" => Ok(ColumnType::Blob),
            "inet" => Ok(ColumnType::Inet),
            other => Err(format!("Unknown column type '{}'", other)),
        }
    }

    /// Registry key for scalar types; collections report their outer kind.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ColumnType::Ascii => "ascii",
            ColumnType::Text => "text",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::SmallInt => "smallint",
            ColumnType::TinyInt => "tinyint",
            ColumnType::Varint => "varint",
            ColumnType::Counter => "counter",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Uuid => "uuid",
            ColumnType::TimeUuid => "timeuuid",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Blob => "blob",
            ColumnType::Inet => "inet",
            ColumnType::List(_) => "list",
            ColumnType::Set(_) => "set",
            ColumnType::Map(_, _) => "map",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Int
                | ColumnType::BigInt
                | ColumnType::SmallInt
                | ColumnType::TinyInt
                | ColumnType::Varint
                | ColumnType::Counter
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Double)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::Ascii | ColumnType::Text)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ColumnType::List(_) | ColumnType::Set(_) | ColumnType::Map(_, _)
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::List(element) => write!(f, "list<{}>", element),
            ColumnType::Set(element) => write!(f, "set<{}>", element),
            ColumnType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            scalar => f.write_str(scalar.type_tag()),
        }
    }
}

fn split_type_arguments(inner: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return Err(format!("Unbalanced type arguments '{}'", inner));
                }
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(format!("Unbalanced type arguments '{}'", inner));
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    Ok(args)
}

// --- Table Metadata ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub keyspace_table: String,
    pub columns: Vec<ColumnDef>,
    pub partition_key: Vec<String>,
    #[serde(default)]
    pub clustering_columns: Vec<String>,
}

impl TableSchema {
    pub fn new(
        keyspace_table: &str,
        columns: Vec<ColumnDef>,
        partition_key: &[&str],
        clustering_columns: &[&str],
    ) -> Result<Self, String> {
        let schema = Self {
            keyspace_table: keyspace_table.trim().to_string(),
            columns,
            partition_key: partition_key.iter().map(|c| c.to_string()).collect(),
            clustering_columns: clustering_columns.iter().map(|c| c.to_string()).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.keyspace_table.is_empty() {
            return Err("keyspaceTable is required".to_string());
        }
        if self.columns.is_empty() {
            return Err(format!("Table {} has no columns", self.keyspace_table));
        }
        if self.partition_key.is_empty() {
            return Err(format!("Table {} has no partition key", self.keyspace_table));
        }
        for (index, column) in self.columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(format!(
                    "Table {} column {} has an empty name",
                    self.keyspace_table,
                    index + 1
                ));
            }
            if self.columns[..index]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(format!(
                    "Table {} declares column '{}' twice",
                    self.keyspace_table, column.name
                ));
            }
        }
        for key in self.primary_key_columns() {
            if self.index_of(&key).is_none() {
                return Err(format!(
                    "Primary key column '{}' is not a column of {}",
                    key, self.keyspace_table
                ));
            }
        }
        Ok(())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type.clone()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(wanted))
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    pub fn column_type(&self, index: usize) -> Option<&ColumnType> {
        self.columns.get(index).map(|c| &c.column_type)
    }

    /// Partition key columns followed by clustering columns.
    pub fn primary_key_columns(&self) -> Vec<String> {
        self.partition_key
            .iter()
            .chain(self.clustering_columns.iter())
            .cloned()
            .collect()
    }

    pub fn primary_key_indexes(&self) -> Vec<usize> {
        self.primary_key_columns()
            .iter()
            .filter_map(|name| self.index_of(name))
            .collect()
    }

    pub fn partition_key_indexes(&self) -> Vec<usize> {
        self.partition_key
            .iter()
            .filter_map(|name| self.index_of(name))
            .collect()
    }

    pub fn is_counter_table(&self) -> bool {
        self.columns
            .iter()
            .any(|column| column.column_type == ColumnType::Counter)
    }
}
