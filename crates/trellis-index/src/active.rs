//! Active-clause analysis.
//!
//! The active clause is the dimension of variation of a cross-filter session:
//! the one clause whose value keeps changing while everything else stays
//! fixed. Analysis derives the *active columns* -- discretized expressions
//! that turn the clause's value space into a finite grouping dimension of the
//! cube -- together with a scheme for translating live clause predicates into
//! predicates over those columns.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trellis_core::clause::{ClauseMeta, ClausePredicate, SelectionClause, Source};
use trellis_sql::expr::{Expr, and, column, is_between, literal};

use crate::bin::BinExpr;
use crate::error::{IndexError, Result};

/// How live clause predicates map onto the active columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateScheme {
    /// Point selections: the incoming predicate is used verbatim (the active
    /// columns are the raw base columns it references).
    Passthrough,
    /// Interval selections: one bin per brushed scale; range endpoints are
    /// mapped numerically through the matching bin.
    Bins(Vec<BinExpr>),
}

/// The analyzed active clause: its identity, the cube columns it contributes,
/// and the predicate translation scheme. Everything here is data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveColumns {
    source: Source,
    columns: IndexMap<String, Expr>,
    scheme: PredicateScheme,
}

impl ActiveColumns {
    /// The clause lineage this analysis belongs to.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The active columns, keyed by their cube alias, in binding order.
    pub fn columns(&self) -> &IndexMap<String, Expr> {
        &self.columns
    }

    /// The base columns the active columns are computed from.
    pub fn base_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for expr in self.columns.values() {
            for name in expr.columns() {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        out
    }

    /// Translates a live clause predicate into a predicate over the active
    /// columns. `None` input means "no selection" and yields no predicate.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::PredicateShape`] when the predicate does not
    /// match the scheme (a point predicate against binned columns, or a
    /// brush with the wrong number of children).
    pub fn predicate(&self, p: Option<&ClausePredicate>) -> Result<Option<Expr>> {
        let Some(p) = p else {
            return Ok(None);
        };
        match &self.scheme {
            PredicateScheme::Passthrough => Ok(Some(p.to_expr())),
            PredicateScheme::Bins(bins) => match p {
                ClausePredicate::Interval(child) if bins.len() == 1 => {
                    Ok(Some(bin_between(0, &bins[0], child.range)))
                }
                ClausePredicate::Intervals(children) if children.len() == bins.len() => {
                    Ok(Some(and(children
                        .iter()
                        .enumerate()
                        .map(|(i, child)| bin_between(i, &bins[i], child.range))
                        .collect())))
                }
                other => Err(IndexError::PredicateShape {
                    expected: match bins.len() {
                        1 => "a single interval".to_owned(),
                        n => format!("{n} intervals"),
                    },
                    got: other.kind().to_owned(),
                }),
            },
        }
    }
}

/// `("active<i>" BETWEEN bin(lo) AND bin(hi))`.
fn bin_between(i: usize, bin: &BinExpr, range: (f64, f64)) -> Expr {
    is_between(
        column(active_name(i)),
        literal(bin.apply(range.0)),
        literal(bin.apply(range.1)),
    )
}

fn active_name(i: usize) -> String {
    format!("active{i}")
}

/// Analyzes a selection clause into active columns.
///
/// Returns `None` when the clause is not indexable: missing source, metadata
/// or predicate, an unsupported scale among the interval's scales, or a
/// predicate whose shape does not match the scale count. Unindexability is
/// data, not an error.
pub fn analyze_active(clause: &SelectionClause) -> Option<ActiveColumns> {
    let source = clause.source.clone()?;
    let meta = clause.meta.as_ref()?;
    let predicate = clause.predicate.as_ref()?;

    match meta {
        ClauseMeta::Point => {
            let columns = predicate
                .columns()
                .into_iter()
                .map(|name| (name.clone(), column(name)))
                .collect();
            Some(ActiveColumns {
                source,
                columns,
                scheme: PredicateScheme::Passthrough,
            })
        }
        ClauseMeta::Interval {
            scales,
            bin,
            pixel_size,
        } => {
            if scales.is_empty() {
                return None;
            }
            let bins: Vec<BinExpr> = scales
                .iter()
                .map(|scale| BinExpr::synthesize(scale, *pixel_size, *bin))
                .collect::<Option<_>>()?;

            let fields: Vec<&Expr> = match predicate {
                ClausePredicate::Interval(child) if bins.len() == 1 => vec![&child.field],
                ClausePredicate::Intervals(children) if children.len() == bins.len() => {
                    children.iter().map(|child| &child.field).collect()
                }
                _ => return None,
            };

            let columns = bins
                .iter()
                .zip(fields)
                .enumerate()
                .map(|(i, (bin, field))| (active_name(i), bin.sql(field)))
                .collect();
            Some(ActiveColumns {
                source,
                columns,
                scheme: PredicateScheme::Bins(bins),
            })
        }
    }
}
