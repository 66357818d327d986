//! SQL builder algebra for the trellis system.
//!
//! Provides the expression model ([`Expr`], [`SelectItem`]), the [`Query`]
//! builder, and DDL statement helpers. Everything here is plain data with
//! deterministic text rendering; no SQL is executed by this crate.

pub mod ddl;
pub mod expr;
pub mod query;

// Re-exports for convenience.
pub use ddl::{CreateOptions, create_schema, create_table_as, drop_schema_cascade};
pub use expr::{
    BinaryOp, Expr, Literal, SelectItem, and, avg, binary, call, column, count, count_star, eq,
    is_between, literal, max, min, quote_ident, sum,
};
pub use query::{Cte, FromItem, Query};
