use crate::data::PartitionRange;
use crate::statement::session::{Binding, BoundSelect, Projection, TableSession};
use crate::statement::token_clause;
use crate::table_types::{DataRow, TableSchema};

/// Target reads by partition range, projecting the target's own columns.
#[derive(Debug, Clone)]
pub struct TargetSelectStatement {
    projections: Vec<Projection>,
    cql: String,
}

impl TargetSelectStatement {
    pub fn build(target: &TableSchema) -> Self {
        let projections = target
            .columns
            .iter()
            .map(|column| Projection::Column(column.name.clone()))
            .collect::<Vec<Projection>>();
        let cql = format!(
            "SELECT {} FROM {} WHERE {}",
            projections
                .iter()
                .map(Projection::cql)
                .collect::<Vec<String>>()
                .join(","),
            target.keyspace_table,
            token_clause(target)
        );
        Self { projections, cql }
    }

    pub fn cql(&self) -> &str {
        &self.cql
    }

    pub fn bind_range(&self, range: PartitionRange) -> BoundSelect {
        BoundSelect {
            cql: self.cql.clone(),
            projections: self.projections.clone(),
            binding: Binding::PartitionRange(range),
        }
    }

    pub async fn execute(
        &self,
        session: &dyn TableSession,
        bound: &BoundSelect,
    ) -> Result<Vec<DataRow>, String> {
        session.select(bound).await
    }
}
