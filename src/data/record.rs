use crate::data::primary_key::PrimaryKey;
use crate::table_types::DataRow;
use std::sync::Arc;

/// One origin row paired with its target counterpart, keyed by the
/// canonical primary key. The origin row is shared between the records an
/// exploded row fans out into.
#[derive(Debug, Clone)]
pub struct Record {
    pk: PrimaryKey,
    origin_row: Arc<DataRow>,
    target_row: Option<DataRow>,
    target_resolved: bool,
}

impl Record {
    pub fn new(pk: PrimaryKey, origin_row: Arc<DataRow>) -> Self {
        Self {
            pk,
            origin_row,
            target_row: None,
            target_resolved: false,
        }
    }

    pub fn pk(&self) -> &PrimaryKey {
        &self.pk
    }

    pub fn origin_row(&self) -> &DataRow {
        &self.origin_row
    }

    pub fn shared_origin_row(&self) -> Arc<DataRow> {
        Arc::clone(&self.origin_row)
    }

    /// `None` until the join step ran, and also when the target has no row.
    pub fn target_row(&self) -> Option<&DataRow> {
        self.target_row.as_ref()
    }

    pub fn is_target_resolved(&self) -> bool {
        self.target_resolved
    }

    /// Records the join result. Can only happen once per record.
    pub fn set_target_row(&mut self, target_row: Option<DataRow>) -> Result<(), String> {
        if self.target_resolved {
            return Err(format!("Target row for key {} was already set", self.pk));
        }
        self.target_row = target_row;
        self.target_resolved = true;
        Ok(())
    }

    pub(crate) fn with_pk(&self, pk: PrimaryKey) -> Record {
        Record {
            pk,
            origin_row: Arc::clone(&self.origin_row),
            target_row: None,
            target_resolved: false,
        }
    }
}
