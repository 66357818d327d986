//! Base-column push-down through subqueries.
//!
//! When the planner asks a query's outermost layer to emit the active
//! columns, every subquery feeding it must also select the base columns those
//! expressions depend on. The walk covers derived tables and CTE-resolved
//! FROM references, memoizing on the builder's stable node ids so shared
//! nodes are visited once.

use std::collections::HashSet;

use trellis_sql::expr::{SelectItem, column};
use trellis_sql::query::Query;

/// Pushes the named base columns down into every subquery of `query` that
/// reads from somewhere. The select-list dedup keeps already-present columns
/// untouched.
pub fn push_down_columns(query: &mut Query, columns: &[String]) {
    let mut seen = HashSet::new();
    descend(query, columns, &mut seen);
}

fn descend(query: &mut Query, columns: &[String], seen: &mut HashSet<u64>) {
    for sub in query.subqueries_mut() {
        if !seen.insert(sub.node_id()) {
            continue;
        }
        if sub.has_from() {
            sub.push_select(columns.iter().map(|name| SelectItem::new(column(name))));
        }
        descend(sub, columns, seen);
    }
}
