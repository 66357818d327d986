//! The selection-clause model.
//!
//! A selection clause is the unit of interaction shipped by a visual client:
//! an identity token (its [`Source`]), the predicate it currently applies,
//! and metadata describing how the interaction varies (a point selection or a
//! pixel-space interval over one or more scales).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use trellis_sql::expr::{Expr, and, is_between, literal};

use crate::scale::ScaleDescriptor;

// ---------------------------------------------------------------------------
// Source tokens
// ---------------------------------------------------------------------------

/// Opaque identity token of a selection clause. Equal tokens mean "same
/// clause lineage"; a change of token invalidates everything derived from the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Bin rounding
// ---------------------------------------------------------------------------

/// How a fractional pixel position snaps to an integer bin.
///
/// Parsed case-insensitively; unknown spellings fall back to `Floor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinMethod {
    #[default]
    Floor,
    Ceil,
    Round,
}

impl BinMethod {
    /// Lenient parse: case-insensitive, anything unrecognized is `Floor`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            _ => Self::Floor,
        }
    }

    /// The SQL function implementing this rounding mode.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Floor => "FLOOR",
            Self::Ceil => "CEIL",
            Self::Round => "ROUND",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
        }
    }

    /// Applies the rounding mode numerically.
    pub fn apply(&self, v: f64) -> f64 {
        match self {
            Self::Floor => v.floor(),
            Self::Ceil => v.ceil(),
            Self::Round => v.round(),
        }
    }
}

impl fmt::Display for BinMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BinMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BinMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

// ---------------------------------------------------------------------------
// Clause metadata
// ---------------------------------------------------------------------------

/// How the clause's selection varies: a point selection over discrete values,
/// or an interval brush in pixel space over one scale per brushed dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClauseMeta {
    Point,
    Interval {
        #[serde(default)]
        scales: Vec<ScaleDescriptor>,
        #[serde(default)]
        bin: BinMethod,
        #[serde(rename = "pixelSize", default = "default_pixel_size")]
        pixel_size: f64,
    },
}

fn default_pixel_size() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Clause predicates
// ---------------------------------------------------------------------------

/// One brushed dimension of an interval selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPredicate {
    /// The expression being filtered (usually a column reference).
    pub field: Expr,
    /// The selected `[lo, hi]` span in data space.
    pub range: (f64, f64),
}

/// The live payload of a selection clause.
///
/// The same type serves both roles the clause plays: at analysis time it
/// exposes the filtered fields and columns; at query time it carries the
/// current selection value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClausePredicate {
    /// A discrete selection; the predicate is used verbatim.
    Point {
        predicate: Expr,
        columns: Vec<String>,
    },
    /// A one-dimensional interval.
    Interval(IntervalPredicate),
    /// A multi-dimensional brush, one child per scale.
    Intervals(Vec<IntervalPredicate>),
}

impl ClausePredicate {
    /// The base columns this predicate references.
    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::Point { columns, .. } => columns.clone(),
            Self::Interval(child) => child.field.columns(),
            Self::Intervals(children) => {
                let mut out: Vec<String> = Vec::new();
                for child in children {
                    for name in child.field.columns() {
                        if !out.contains(&name) {
                            out.push(name);
                        }
                    }
                }
                out
            }
        }
    }

    /// Renders the predicate as a SQL expression over the base columns.
    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Point { predicate, .. } => predicate.clone(),
            Self::Interval(child) => child.to_expr(),
            Self::Intervals(children) => {
                and(children.iter().map(IntervalPredicate::to_expr).collect())
            }
        }
    }

    /// A short label for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point { .. } => "point",
            Self::Interval(_) => "interval",
            Self::Intervals(_) => "intervals",
        }
    }
}

impl IntervalPredicate {
    fn to_expr(&self) -> Expr {
        is_between(
            self.field.clone(),
            literal(self.range.0),
            literal(self.range.1),
        )
    }
}

// ---------------------------------------------------------------------------
// Selection clauses
// ---------------------------------------------------------------------------

/// A selection clause as received from a visual client. Any of the parts may
/// be absent; missing parts make the clause unindexable, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionClause {
    pub source: Option<Source>,
    pub predicate: Option<ClausePredicate>,
    pub meta: Option<ClauseMeta>,
}

impl SelectionClause {
    /// A point-selection clause.
    pub fn point(source: impl Into<Source>, predicate: Expr, columns: Vec<String>) -> Self {
        Self {
            source: Some(source.into()),
            predicate: Some(ClausePredicate::Point { predicate, columns }),
            meta: Some(ClauseMeta::Point),
        }
    }

    /// A single-scale interval clause.
    pub fn interval(
        source: impl Into<Source>,
        field: Expr,
        range: (f64, f64),
        scale: ScaleDescriptor,
        bin: BinMethod,
        pixel_size: f64,
    ) -> Self {
        Self {
            source: Some(source.into()),
            predicate: Some(ClausePredicate::Interval(IntervalPredicate { field, range })),
            meta: Some(ClauseMeta::Interval {
                scales: vec![scale],
                bin,
                pixel_size,
            }),
        }
    }

    /// A multi-scale interval clause (e.g. a 2-D brush).
    pub fn intervals(
        source: impl Into<Source>,
        children: Vec<IntervalPredicate>,
        scales: Vec<ScaleDescriptor>,
        bin: BinMethod,
        pixel_size: f64,
    ) -> Self {
        Self {
            source: Some(source.into()),
            predicate: Some(ClausePredicate::Intervals(children)),
            meta: Some(ClauseMeta::Interval {
                scales,
                bin,
                pixel_size,
            }),
        }
    }
}
