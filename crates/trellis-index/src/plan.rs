//! Cube planning: from a client query and an analyzed active clause to the
//! materialization query, the content-addressed table name, and the
//! parameterized select over the cube.

use tracing::debug;
use trellis_core::clause::ClausePredicate;
use trellis_core::hash::content_id;
use trellis_sql::expr::{SelectItem, column};
use trellis_sql::query::Query;

use crate::active::ActiveColumns;
use crate::client::IndexColumns;
use crate::coordinator::ExecHandle;
use crate::error::Result;
use crate::pushdown::push_down_columns;

/// The planner's output, before DDL submission.
#[derive(Debug)]
pub(crate) struct CubePlan {
    pub id: String,
    pub table: String,
    pub create: String,
    pub select: Query,
}

/// Plans the cube for `client_query` under the given active columns and
/// client-declared index columns.
///
/// The materialization augments the client's own aggregation with the active
/// bins as extra grouping dimensions (plus any auxiliary columns), pushes the
/// active base columns into every feeding subquery, and defers ordering to
/// the select layer: the cube itself need not be ordered, and the rendered
/// text stays a pure function of the query shape for hashing.
pub(crate) fn plan_cube(
    client_query: Query,
    active: &ActiveColumns,
    index_cols: &IndexColumns,
    schema: &str,
) -> CubePlan {
    let mut query = client_query
        .with_select(
            active
                .columns()
                .iter()
                .chain(index_cols.aux.iter())
                .map(|(name, expr)| SelectItem::aliased(expr.clone(), name)),
        )
        .group_by(active.columns().keys().map(column));

    push_down_columns(&mut query, &active.base_columns());

    let order = query.take_order_by();

    let create = query.to_string();
    let id = content_id(&create);
    let table = format!("{schema}.cube_{id}");
    debug!(%table, "planned data cube");

    let select = Query::new()
        .with_select(
            index_cols
                .dims
                .iter()
                .map(|dim| SelectItem::new(column(dim)))
                .chain(index_cols.aggr.iter().cloned()),
        )
        .from_table(&table)
        .group_by(index_cols.dims.iter().map(column))
        .order_by(order);

    CubePlan {
        id,
        table,
        create,
        select,
    }
}

/// A materialized (or in-flight) data cube for one client.
#[derive(Debug)]
pub struct CubeInfo {
    /// Content hash of the materialization query.
    pub id: String,
    /// Schema-qualified cube table name.
    pub table: String,
    /// The materialization query text (the `AS` body of the DDL).
    pub create: String,
    /// The active-clause analysis this cube was planned against.
    pub active: ActiveColumns,
    /// Handle to the DDL execution; wait on it before querying the cube.
    pub result: ExecHandle,
    select: Query,
}

impl CubeInfo {
    pub(crate) fn new(plan: CubePlan, active: ActiveColumns, result: ExecHandle) -> Self {
        Self {
            id: plan.id,
            table: plan.table,
            create: plan.create,
            active,
            result,
            select: plan.select,
        }
    }

    /// The WHERE-less select template over the cube table.
    pub fn select_template(&self) -> &Query {
        &self.select
    }

    /// The select query answering the client's result for the given live
    /// predicate. Each call starts from the clean template, so WHERE terms
    /// never accumulate.
    pub fn query(&self, predicate: Option<&ClausePredicate>) -> Result<Query> {
        let query = self.select.clone();
        Ok(query.maybe_filter(self.active.predicate(predicate)?))
    }
}
