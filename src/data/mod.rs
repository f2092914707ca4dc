//! Row-level data model: cell values, keys, records and the mapping from
//! origin columns onto target columns.

pub mod column_mapping;
pub mod partition;
pub mod primary_key;
pub mod record;
pub mod value_codec;

pub use column_mapping::{ColumnMapping, ColumnSource};
pub use partition::PartitionRange;
pub use primary_key::{PkFactory, PkSide, PkState, PrimaryKey, PK_FIELD_SEPARATOR};
pub use record::Record;
