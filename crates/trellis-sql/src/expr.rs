//! SQL expression nodes and rendering.
//!
//! Expressions are plain data -- no closures, no interpreter state -- so that
//! consumers can inspect, serialize, and hash the SQL they are about to run.
//! Rendering is deterministic: the same expression tree always produces the
//! same text.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A literal SQL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal. Rendered without a trailing `.0` for whole values.
    Number(f64),
    /// String literal, single-quoted with `''` escaping.
    String(String),
    /// Boolean literal, rendered `TRUE` / `FALSE`.
    Boolean(bool),
    /// The SQL `NULL`.
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators used in comparisons and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Returns the SQL spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A SQL expression tree.
///
/// Column references carry their identifier unquoted; quoting happens at
/// render time. `Raw` fragments carry pre-rendered text along with the base
/// columns they reference, so column extraction stays exact even for
/// hand-assembled SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A reference to a column by name.
    Column(String),
    /// A literal value.
    Literal(Literal),
    /// A function call, e.g. `SUM("x")`.
    Call { func: String, args: Vec<Expr> },
    /// A range test, rendered `(expr BETWEEN lo AND hi)`.
    Between {
        expr: Box<Expr>,
        lo: Box<Expr>,
        hi: Box<Expr>,
    },
    /// A binary operation, rendered `(lhs op rhs)`.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A conjunction, rendered `(a AND b AND ...)`.
    And { args: Vec<Expr> },
    /// A pre-rendered SQL fragment with its referenced base columns.
    Raw { sql: String, columns: Vec<String> },
}

impl Expr {
    /// Returns the base columns referenced by this expression, in first-seen
    /// order, without duplicates.
    pub fn columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        let mut push = |name: &str| {
            if !out.iter().any(|c| c == name) {
                out.push(name.to_owned());
            }
        };
        match self {
            Self::Column(name) => push(name),
            Self::Literal(_) => {}
            Self::Call { args, .. } | Self::And { args } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
            Self::Between { expr, lo, hi } => {
                expr.collect_columns(out);
                lo.collect_columns(out);
                hi.collect_columns(out);
            }
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
            Self::Raw { columns, .. } => {
                for name in columns {
                    push(name);
                }
            }
        }
    }

    /// Builds a raw fragment with its referenced columns.
    pub fn raw(sql: impl Into<String>, columns: Vec<String>) -> Self {
        Self::Raw {
            sql: sql.into(),
            columns,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{}", quote_ident(name)),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Between { expr, lo, hi } => write!(f, "({expr} BETWEEN {lo} AND {hi})"),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.as_str()),
            Self::And { args } => match args.len() {
                0 => f.write_str("TRUE"),
                1 => write!(f, "{}", args[0]),
                _ => {
                    f.write_str("(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" AND ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(")")
                }
            },
            Self::Raw { sql, .. } => f.write_str(sql),
        }
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// A reference to the named column.
pub fn column(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// A literal value expression.
pub fn literal(value: impl Into<Literal>) -> Expr {
    Expr::Literal(value.into())
}

/// A function call expression.
pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::Call {
        func: func.into(),
        args,
    }
}

/// A `BETWEEN` range test over an inclusive `[lo, hi]` pair.
pub fn is_between(expr: Expr, lo: Expr, hi: Expr) -> Expr {
    Expr::Between {
        expr: Box::new(expr),
        lo: Box::new(lo),
        hi: Box::new(hi),
    }
}

/// An equality comparison.
pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Eq, lhs, rhs)
}

/// A binary operation.
pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// The conjunction of the given terms. Empty input renders `TRUE`; a single
/// term renders bare.
pub fn and(args: Vec<Expr>) -> Expr {
    Expr::And { args }
}

/// `SUM(expr)`.
pub fn sum(expr: Expr) -> Expr {
    call("SUM", vec![expr])
}

/// `MIN(expr)`.
pub fn min(expr: Expr) -> Expr {
    call("MIN", vec![expr])
}

/// `MAX(expr)`.
pub fn max(expr: Expr) -> Expr {
    call("MAX", vec![expr])
}

/// `AVG(expr)`.
pub fn avg(expr: Expr) -> Expr {
    call("AVG", vec![expr])
}

/// `COUNT(expr)`.
pub fn count(expr: Expr) -> Expr {
    call("COUNT", vec![expr])
}

/// `COUNT(*)`.
pub fn count_star() -> Expr {
    call("COUNT", vec![Expr::raw("*", Vec::new())])
}

// ---------------------------------------------------------------------------
// Select items
// ---------------------------------------------------------------------------

/// An entry in a SELECT list: an expression plus an optional alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    expr: Expr,
    alias: Option<String>,
}

impl SelectItem {
    /// A select item with no explicit alias.
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    /// A select item with an explicit alias.
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The output name of this item: the alias if present, otherwise the
    /// column name for bare column references. Complex unaliased expressions
    /// have no name.
    pub fn name(&self) -> Option<&str> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias),
            (None, Expr::Column(name)) => Some(name),
            _ => None,
        }
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl fmt::Display for SelectItem {
    /// Renders `expr AS "alias"`. The `AS` is elided when the expression is a
    /// bare column reference with the same name, so `"category"` aliased as
    /// `category` prints as just `"category"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) if !matches!(&self.expr, Expr::Column(name) if name == alias) => {
                write!(f, "{} AS {}", self.expr, quote_ident(alias))
            }
            _ => write!(f, "{}", self.expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_columns_and_literals() {
        assert_eq!(column("year").to_string(), "\"year\"");
        assert_eq!(literal(5.0).to_string(), "5");
        assert_eq!(literal(2.5).to_string(), "2.5");
        assert_eq!(literal("O'Brien").to_string(), "'O''Brien'");
        assert_eq!(literal(true).to_string(), "TRUE");
        assert_eq!(Expr::Literal(Literal::Null).to_string(), "NULL");
    }

    #[test]
    fn renders_calls() {
        assert_eq!(sum(column("sales")).to_string(), "SUM(\"sales\")");
        assert_eq!(count_star().to_string(), "COUNT(*)");
        assert_eq!(
            call("LN", vec![column("x")]).to_string(),
            "LN(\"x\")"
        );
    }

    #[test]
    fn renders_between_and_conjunctions() {
        let e = is_between(column("active0"), literal(100.0), literal(200.0));
        assert_eq!(e.to_string(), "(\"active0\" BETWEEN 100 AND 200)");

        let both = and(vec![
            is_between(column("a"), literal(0.0), literal(1.0)),
            is_between(column("b"), literal(2.0), literal(3.0)),
        ]);
        assert_eq!(
            both.to_string(),
            "((\"a\" BETWEEN 0 AND 1) AND (\"b\" BETWEEN 2 AND 3))"
        );

        // Single-term conjunctions render bare, empty ones render TRUE.
        assert_eq!(and(vec![column("x")]).to_string(), "\"x\"");
        assert_eq!(and(vec![]).to_string(), "TRUE");
    }

    #[test]
    fn renders_comparisons() {
        let e = eq(column("category"), literal("Fiction"));
        assert_eq!(e.to_string(), "(\"category\" = 'Fiction')");
    }

    #[test]
    fn collects_columns_in_order_without_duplicates() {
        let e = and(vec![
            eq(column("b"), literal(1.0)),
            binary(BinaryOp::Add, column("a"), column("b")),
        ]);
        assert_eq!(e.columns(), vec!["b".to_owned(), "a".to_owned()]);
    }

    #[test]
    fn raw_fragments_track_columns() {
        let e = Expr::raw("FLOOR(\"x\")::INTEGER", vec!["x".into()]);
        assert_eq!(e.to_string(), "FLOOR(\"x\")::INTEGER");
        assert_eq!(e.columns(), vec!["x".to_owned()]);
    }

    #[test]
    fn select_item_names() {
        assert_eq!(SelectItem::new(column("year")).name(), Some("year"));
        assert_eq!(
            SelectItem::aliased(sum(column("sales")), "s").name(),
            Some("s")
        );
        assert_eq!(SelectItem::new(sum(column("sales"))).name(), None);
        assert_eq!(
            SelectItem::aliased(sum(column("sales")), "s").to_string(),
            "SUM(\"sales\") AS \"s\""
        );
    }

    #[test]
    fn same_name_column_alias_is_elided() {
        let item = SelectItem::aliased(column("category"), "category");
        assert_eq!(item.to_string(), "\"category\"");
        assert_eq!(item.name(), Some("category"));

        // A genuine rename keeps the alias.
        assert_eq!(
            SelectItem::aliased(column("category"), "c").to_string(),
            "\"category\" AS \"c\""
        );
    }

    #[test]
    fn quotes_embedded_identifier_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
