//! The `Query` builder: a small relational algebra over SELECT statements.
//!
//! Builder methods move `self` and return it, so a query is always owned by
//! exactly one place and rendering is a pure function of the structure. Every
//! query carries a stable node id assigned at construction; graph walks (such
//! as column push-down) memoize on that id instead of on object identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::expr::{Expr, SelectItem, quote_ident};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

// ---------------------------------------------------------------------------
// FROM clause
// ---------------------------------------------------------------------------

/// An entry in a query's FROM list.
#[derive(Debug, Clone)]
pub enum FromItem {
    /// A (possibly schema-qualified) table reference.
    Table { name: String },
    /// A derived table.
    Subquery {
        query: Box<Query>,
        alias: Option<String>,
    },
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { name } => {
                let parts: Vec<String> = name.split('.').map(quote_ident).collect();
                write!(f, "{}", parts.join("."))
            }
            Self::Subquery { query, alias } => {
                write!(f, "({query})")?;
                if let Some(alias) = alias {
                    write!(f, " AS {}", quote_ident(alias))?;
                }
                Ok(())
            }
        }
    }
}

/// A common table expression: `WITH name AS (query)`.
#[derive(Debug, Clone)]
pub struct Cte {
    pub name: String,
    pub query: Query,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A SELECT statement under construction.
#[derive(Debug)]
pub struct Query {
    id: u64,
    with: Vec<Cte>,
    select: Vec<SelectItem>,
    from: Vec<FromItem>,
    filter: Vec<Expr>,
    group_by: Vec<Expr>,
    order_by: Vec<Expr>,
    limit: Option<u64>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Query {
    /// Cloning produces a structurally identical query under a fresh node id:
    /// a clone is a new AST construction, not the same node.
    fn clone(&self) -> Self {
        Self {
            id: fresh_node_id(),
            with: self.with.clone(),
            select: self.select.clone(),
            from: self.from.clone(),
            filter: self.filter.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
        }
    }
}

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self {
            id: fresh_node_id(),
            with: Vec::new(),
            select: Vec::new(),
            from: Vec::new(),
            filter: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// The stable node id assigned at construction.
    pub fn node_id(&self) -> u64 {
        self.id
    }

    // -- WITH ----------------------------------------------------------------

    /// Appends a common table expression.
    pub fn with_cte(mut self, name: impl Into<String>, query: Query) -> Self {
        self.with.push(Cte {
            name: name.into(),
            query,
        });
        self
    }

    pub fn cte_list(&self) -> &[Cte] {
        &self.with
    }

    // -- SELECT --------------------------------------------------------------

    /// Appends select items, deduplicating by output name: an item whose name
    /// matches an existing entry is dropped.
    pub fn with_select(mut self, items: impl IntoIterator<Item = SelectItem>) -> Self {
        self.push_select(items);
        self
    }

    /// In-place variant of [`with_select`](Self::with_select).
    pub fn push_select(&mut self, items: impl IntoIterator<Item = SelectItem>) {
        for item in items {
            let duplicate = match item.name() {
                Some(name) => self.select.iter().any(|s| s.name() == Some(name)),
                None => false,
            };
            if !duplicate {
                self.select.push(item);
            }
        }
    }

    pub fn select_list(&self) -> &[SelectItem] {
        &self.select
    }

    // -- FROM ----------------------------------------------------------------

    /// Appends a table reference to the FROM list.
    pub fn from_table(mut self, name: impl Into<String>) -> Self {
        self.from.push(FromItem::Table { name: name.into() });
        self
    }

    /// Appends a derived table.
    pub fn from_query(mut self, query: Query, alias: impl Into<String>) -> Self {
        self.from.push(FromItem::Subquery {
            query: Box::new(query),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn from_list(&self) -> &[FromItem] {
        &self.from
    }

    /// Whether this query reads from anything at all.
    pub fn has_from(&self) -> bool {
        !self.from.is_empty()
    }

    // -- WHERE ---------------------------------------------------------------

    /// Appends a WHERE term; terms are conjoined at render time.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter.push(predicate);
        self
    }

    /// Appends a WHERE term when one is present.
    pub fn maybe_filter(self, predicate: Option<Expr>) -> Self {
        match predicate {
            Some(predicate) => self.filter(predicate),
            None => self,
        }
    }

    pub fn filter_list(&self) -> &[Expr] {
        &self.filter
    }

    // -- GROUP BY / ORDER BY / LIMIT ------------------------------------------

    /// Appends grouping expressions.
    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.push_group_by(exprs);
        self
    }

    /// In-place variant of [`group_by`](Self::group_by).
    pub fn push_group_by(&mut self, exprs: impl IntoIterator<Item = Expr>) {
        self.group_by.extend(exprs);
    }

    pub fn group_by_list(&self) -> &[Expr] {
        &self.group_by
    }

    /// Appends ordering expressions.
    pub fn order_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.order_by.extend(exprs);
        self
    }

    pub fn order_by_list(&self) -> &[Expr] {
        &self.order_by
    }

    /// Removes and returns the current ORDER BY list, leaving the query
    /// unordered.
    pub fn take_order_by(&mut self) -> Vec<Expr> {
        std::mem::take(&mut self.order_by)
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    // -- Subquery traversal ---------------------------------------------------

    /// Returns mutable references to the direct subqueries of this query:
    /// derived tables in the FROM list, plus FROM table references that
    /// resolve to one of this query's own CTEs.
    pub fn subqueries_mut(&mut self) -> Vec<&mut Query> {
        let mut referenced: Vec<String> = Vec::new();
        for item in &self.from {
            if let FromItem::Table { name } = item {
                referenced.push(name.clone());
            }
        }

        let mut out: Vec<&mut Query> = Vec::new();
        for item in &mut self.from {
            if let FromItem::Subquery { query, .. } = item {
                out.push(query);
            }
        }
        for cte in &mut self.with {
            if referenced.iter().any(|name| *name == cte.name) {
                out.push(&mut cte.query);
            }
        }
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.with.is_empty() {
            f.write_str("WITH ")?;
            for (i, cte) in self.with.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} AS ({})", quote_ident(&cte.name), cte.query)?;
            }
            f.write_str(" ")?;
        }

        f.write_str("SELECT ")?;
        if self.select.is_empty() {
            f.write_str("*")?;
        } else {
            for (i, item) in self.select.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
        }

        if !self.from.is_empty() {
            f.write_str(" FROM ")?;
            for (i, item) in self.from.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
        }

        if !self.filter.is_empty() {
            f.write_str(" WHERE ")?;
            for (i, term) in self.filter.iter().enumerate() {
                if i > 0 {
                    f.write_str(" AND ")?;
                }
                write!(f, "{term}")?;
            }
        }

        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{expr}")?;
            }
        }

        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, expr) in self.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{expr}")?;
            }
        }

        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }

        Ok(())
    }
}
