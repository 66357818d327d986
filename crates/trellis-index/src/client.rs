//! The client capability: what the indexer needs to know about a visual
//! client, plus the default derivation of its index columns.
//!
//! A client is indexable iff its SELECT list consists only of GROUP BY
//! dimensions and supported aggregates. For each aggregate the cube stores
//! the per-group partial result under the client's alias, and the index
//! columns carry the re-aggregation that recovers the client's value from
//! cube rows.

use indexmap::IndexMap;
use trellis_sql::expr::{BinaryOp, Expr, SelectItem, binary, column, count_star, max, min, sum};
use trellis_sql::query::Query;

/// Stable identity of a client within one indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Alias of the auxiliary per-group row count carried for `avg`
/// re-aggregation.
const COUNT_COLUMN: &str = "__count__";

/// The client-declared cube schema: grouping dimensions, re-aggregation
/// select items, and auxiliary columns the cube must additionally store.
#[derive(Debug, Clone)]
pub struct IndexColumns {
    /// GROUP BY dimension column names.
    pub dims: Vec<String>,
    /// Re-aggregation items over cube columns, aliased like the client's own.
    pub aggr: Vec<SelectItem>,
    /// Extra columns the cube materialization must select.
    pub aux: IndexMap<String, Expr>,
}

/// A visual client owning a parametric aggregation query.
pub trait DataCubeClient {
    /// Identity of this client within the indexer's cache.
    fn id(&self) -> ClientId;

    /// The client's aggregation query with the given predicate substituted
    /// into its WHERE clause.
    fn query(&self, filter: Option<Expr>) -> Query;

    /// The cube schema for this client, or `None` when the client's query is
    /// not indexable.
    fn index_columns(&self) -> Option<IndexColumns> {
        derive_index_columns(&self.query(None))
    }
}

/// Derives [`IndexColumns`] by inspecting a client query.
///
/// Every select item must be either a bare GROUP BY column (a dimension) or a
/// supported aggregate call with an output name. `count` and `sum` partials
/// re-aggregate with `SUM`, `min`/`max` with themselves, and `avg` as a
/// count-weighted mean over a shared auxiliary row count. Anything else makes
/// the query unindexable (`None`).
pub fn derive_index_columns(query: &Query) -> Option<IndexColumns> {
    let mut group_cols: Vec<&str> = Vec::new();
    for expr in query.group_by_list() {
        match expr {
            Expr::Column(name) => group_cols.push(name),
            _ => return None,
        }
    }

    let mut dims = Vec::new();
    let mut aggr = Vec::new();
    let mut needs_count = false;

    for item in query.select_list() {
        let name = item.name()?.to_owned();
        match item.expr() {
            Expr::Column(col) if group_cols.contains(&col.as_str()) => dims.push(name),
            Expr::Call { func, .. } => match func.to_ascii_uppercase().as_str() {
                "COUNT" | "SUM" => {
                    aggr.push(SelectItem::aliased(sum(column(&name)), &name));
                }
                "MIN" => aggr.push(SelectItem::aliased(min(column(&name)), &name)),
                "MAX" => aggr.push(SelectItem::aliased(max(column(&name)), &name)),
                "AVG" => {
                    needs_count = true;
                    let weighted = binary(
                        BinaryOp::Div,
                        sum(binary(
                            BinaryOp::Mul,
                            column(&name),
                            column(COUNT_COLUMN),
                        )),
                        sum(column(COUNT_COLUMN)),
                    );
                    aggr.push(SelectItem::aliased(weighted, &name));
                }
                _ => return None,
            },
            _ => return None,
        }
    }

    let mut aux = IndexMap::new();
    if needs_count {
        aux.insert(COUNT_COLUMN.to_owned(), count_star());
    }

    Some(IndexColumns { dims, aggr, aux })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_sql::expr::{avg, call, count};

    use super::*;

    fn grouped(select: Vec<SelectItem>, dims: &[&str]) -> Query {
        Query::new()
            .with_select(select)
            .from_table("sales")
            .group_by(dims.iter().map(|d| column(*d)))
    }

    #[test]
    fn dims_and_sum_aggregates() {
        let q = grouped(
            vec![
                SelectItem::new(column("year")),
                SelectItem::aliased(sum(column("sales")), "s"),
            ],
            &["year"],
        );
        let cols = derive_index_columns(&q).unwrap();
        assert_eq!(cols.dims, vec!["year".to_owned()]);
        assert_eq!(cols.aggr.len(), 1);
        assert_eq!(cols.aggr[0].to_string(), "SUM(\"s\") AS \"s\"");
        assert!(cols.aux.is_empty());
    }

    #[test]
    fn count_reaggregates_with_sum() {
        let q = grouped(
            vec![
                SelectItem::new(column("year")),
                SelectItem::aliased(count_star(), "n"),
            ],
            &["year"],
        );
        let cols = derive_index_columns(&q).unwrap();
        assert_eq!(cols.aggr[0].to_string(), "SUM(\"n\") AS \"n\"");
    }

    #[test]
    fn min_max_reaggregate_with_themselves() {
        let q = grouped(
            vec![
                SelectItem::new(column("year")),
                SelectItem::aliased(min(column("price")), "lo"),
                SelectItem::aliased(max(column("price")), "hi"),
            ],
            &["year"],
        );
        let cols = derive_index_columns(&q).unwrap();
        assert_eq!(cols.aggr[0].to_string(), "MIN(\"lo\") AS \"lo\"");
        assert_eq!(cols.aggr[1].to_string(), "MAX(\"hi\") AS \"hi\"");
    }

    #[test]
    fn avg_uses_a_shared_count_weighted_mean() {
        let q = grouped(
            vec![
                SelectItem::new(column("year")),
                SelectItem::aliased(avg(column("price")), "p"),
                SelectItem::aliased(avg(column("qty")), "q"),
            ],
            &["year"],
        );
        let cols = derive_index_columns(&q).unwrap();
        assert_eq!(
            cols.aggr[0].to_string(),
            "(SUM((\"p\" * \"__count__\")) / SUM(\"__count__\")) AS \"p\""
        );
        // One shared auxiliary count column for all avg items.
        assert_eq!(cols.aux.len(), 1);
        assert_eq!(cols.aux[COUNT_COLUMN].to_string(), "COUNT(*)");
    }

    #[test]
    fn unsupported_shapes_yield_none() {
        // Unsupported aggregate function.
        let q = grouped(
            vec![
                SelectItem::new(column("year")),
                SelectItem::aliased(call("MEDIAN", vec![column("price")]), "m"),
            ],
            &["year"],
        );
        assert!(derive_index_columns(&q).is_none());

        // Selected column that is not a grouping dimension.
        let q = grouped(
            vec![
                SelectItem::new(column("year")),
                SelectItem::new(column("region")),
            ],
            &["year"],
        );
        assert!(derive_index_columns(&q).is_none());

        // Unaliased aggregate has no output name.
        let q = grouped(vec![SelectItem::new(count(column("x")))], &[]);
        assert!(derive_index_columns(&q).is_none());

        // Computed grouping expression.
        let q = Query::new()
            .with_select(vec![SelectItem::aliased(sum(column("x")), "s")])
            .from_table("t")
            .group_by([call("UPPER", vec![column("name")])]);
        assert!(derive_index_columns(&q).is_none());
    }
}
