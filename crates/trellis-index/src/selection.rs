//! The selection capability consumed by the indexer.

use trellis_core::clause::{SelectionClause, Source};
use trellis_sql::expr::Expr;

use crate::client::DataCubeClient;

/// Read-side view of a selection, sufficient for cube planning.
pub trait Selection {
    /// The materialized predicate for `client` over every clause except those
    /// originating from `source`. The cube DDL's WHERE must carry only the
    /// non-active predicates; the active one is re-applied per refresh via
    /// the cube query.
    fn predicate_without(
        &self,
        client: &dyn DataCubeClient,
        source: &Source,
    ) -> Option<Expr>;

    /// Optimization hint: `true` iff `client` is unaffected by the current
    /// cross-filter update for `clause`.
    fn skip(&self, client: &dyn DataCubeClient, clause: &SelectionClause) -> bool;
}
