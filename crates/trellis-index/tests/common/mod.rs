//! Shared fixtures for indexer integration tests: a recording coordinator, a
//! scripted selection, and a simple aggregate client.

use std::sync::{Arc, Mutex};

use trellis_core::clause::{SelectionClause, Source};
use trellis_index::{ClientId, Coordinator, DataCubeClient, ExecError, ExecHandle, Selection};
use trellis_sql::expr::{Expr, SelectItem, column, sum};
use trellis_sql::query::Query;

/// Coordinator that records every submitted batch and resolves immediately,
/// optionally with a scripted failure.
pub struct RecordingCoordinator {
    batches: Mutex<Vec<Vec<String>>>,
    fail_with: Option<String>,
    logged: Mutex<Vec<String>>,
}

impl RecordingCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail_with: None,
            logged: Mutex::new(Vec::new()),
        })
    }

    /// A coordinator whose every batch fails with `message`.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail_with: Some(message.to_owned()),
            logged: Mutex::new(Vec::new()),
        })
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn logged_errors(&self) -> Vec<String> {
        self.logged.lock().unwrap().clone()
    }
}

impl Coordinator for RecordingCoordinator {
    fn exec(&self, statements: Vec<String>) -> ExecHandle {
        self.batches.lock().unwrap().push(statements);
        match &self.fail_with {
            Some(message) => ExecHandle::resolved(Err(ExecError::new(message.clone()))),
            None => ExecHandle::resolved(Ok(())),
        }
    }

    fn log_error(&self, error: &ExecError) {
        self.logged.lock().unwrap().push(error.to_string());
    }
}

/// Selection stub returning a fixed residual predicate and skip flag.
#[derive(Default)]
pub struct ScriptedSelection {
    pub residual: Option<Expr>,
    pub skip_all: bool,
}

impl Selection for ScriptedSelection {
    fn predicate_without(&self, _client: &dyn DataCubeClient, _source: &Source) -> Option<Expr> {
        self.residual.clone()
    }

    fn skip(&self, _client: &dyn DataCubeClient, _clause: &SelectionClause) -> bool {
        self.skip_all
    }
}

/// A client owning a fixed aggregation query; the filter lands in its WHERE.
pub struct AggregateClient {
    id: ClientId,
    base: Query,
}

impl AggregateClient {
    pub fn new(id: u64, base: Query) -> Self {
        Self {
            id: ClientId(id),
            base,
        }
    }
}

impl DataCubeClient for AggregateClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn query(&self, filter: Option<Expr>) -> Query {
        self.base.clone().maybe_filter(filter)
    }
}

/// `SELECT "year", SUM("sales") AS "s" FROM "sales" GROUP BY "year"`.
pub fn sales_client(id: u64) -> AggregateClient {
    AggregateClient::new(
        id,
        Query::new()
            .with_select([
                SelectItem::new(column("year")),
                SelectItem::aliased(sum(column("sales")), "s"),
            ])
            .from_table("sales")
            .group_by([column("year")]),
    )
}
