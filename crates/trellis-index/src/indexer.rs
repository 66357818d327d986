//! The cube indexer: per-coordinator cache of active-clause analyses and
//! per-client cube materializations.
//!
//! One indexer instance belongs to one coordinator and is driven from a
//! single-threaded event loop: every cache read and write happens
//! synchronously inside [`CubeIndexer::index`], and the only asynchronous
//! artifact is the DDL [`ExecHandle`] stored on each cube. In-flight DDL is
//! never cancelled; eviction only ever drops references.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trellis_core::clause::{SelectionClause, Source};
use trellis_sql::ddl::{CreateOptions, create_schema, create_table_as, drop_schema_cascade};

use crate::active::{ActiveColumns, analyze_active};
use crate::client::{ClientId, DataCubeClient};
use crate::coordinator::{Coordinator, ExecHandle};
use crate::plan::{CubeInfo, plan_cube};
use crate::selection::Selection;

/// Construction options for [`CubeIndexer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerOptions {
    /// Database schema holding the cube tables.
    pub schema: String,
    /// Whether indexing is active at all.
    pub enabled: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            schema: "mosaic".to_owned(),
            enabled: true,
        }
    }
}

/// The cached outcome of indexing one client under the current active clause.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Cube planned and DDL issued.
    Built(Arc<CubeInfo>),
    /// Client is indexable but untouched by the current cross-filter.
    Skip,
    /// Client or clause cannot be indexed.
    Unindexable,
}

impl CacheEntry {
    /// The cube info, when this entry carries one.
    pub fn as_built(&self) -> Option<&Arc<CubeInfo>> {
        match self {
            Self::Built(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    pub fn is_unindexable(&self) -> bool {
        matches!(self, Self::Unindexable)
    }
}

/// The memoized analysis of the current active clause. An unindexable clause
/// is remembered together with its source, so repeated updates from the same
/// clause lineage short-circuit without re-analysis, while a genuine source
/// change still clears the epoch.
enum ActiveState {
    Columns(ActiveColumns),
    Unindexable { source: Source },
}

impl ActiveState {
    fn source(&self) -> &Source {
        match self {
            Self::Columns(active) => active.source(),
            Self::Unindexable { source } => source,
        }
    }
}

/// Per-coordinator data cube indexer.
pub struct CubeIndexer {
    coordinator: Arc<dyn Coordinator>,
    schema: String,
    enabled: bool,
    active: Option<ActiveState>,
    entries: HashMap<ClientId, CacheEntry>,
}

impl CubeIndexer {
    /// An indexer submitting DDL through `coordinator`.
    pub fn new(coordinator: Arc<dyn Coordinator>, options: IndexerOptions) -> Self {
        Self {
            coordinator,
            schema: options.schema,
            enabled: options.enabled,
            active: None,
            entries: HashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables indexing. Disabling clears the cache first;
    /// persisted cube tables are untouched either way.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.clear();
        }
        self.enabled = enabled;
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Moves cube materialization to a different schema. A new value clears
    /// the cache; existing tables in the old schema are not dropped.
    pub fn set_schema(&mut self, schema: impl Into<String>) {
        let schema = schema.into();
        if schema != self.schema {
            debug!(from = %self.schema, to = %schema, "cube schema changed");
            self.clear();
            self.schema = schema;
        }
    }

    /// Empties the cube cache and forgets the active clause. Outstanding DDL
    /// handles are not cancelled; their results become unreferenced.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.active = None;
    }

    /// The analysis of the current active clause, when one is indexable.
    pub fn active_columns(&self) -> Option<&ActiveColumns> {
        match self.active.as_ref()? {
            ActiveState::Columns(active) => Some(active),
            ActiveState::Unindexable { .. } => None,
        }
    }

    /// Number of clients with a cached entry.
    pub fn cached_clients(&self) -> usize {
        self.entries.len()
    }

    /// Drops the entire cube schema (`DROP SCHEMA ... CASCADE`) after
    /// clearing local state. Intended for use after base-table updates
    /// invalidate the cached cubes.
    pub fn drop_index_tables(&mut self) -> ExecHandle {
        self.clear();
        info!(schema = %self.schema, "dropping cube schema");
        let handle = self
            .coordinator
            .exec(vec![drop_schema_cascade(&self.schema)]);
        let coordinator = Arc::clone(&self.coordinator);
        handle.on_error(move |err| coordinator.log_error(err));
        handle
    }

    /// Indexes one client update: analyzes the active clause (memoized),
    /// consults the per-client cache, and on a miss plans the cube and
    /// submits its DDL.
    ///
    /// Never fails on data-dependent conditions -- anything the indexer
    /// cannot handle comes back as [`CacheEntry::Unindexable`]. DDL failures
    /// are asynchronous: they land on the entry's `result` handle and in the
    /// coordinator's error log, and do not evict the entry.
    pub fn index(
        &mut self,
        client: &dyn DataCubeClient,
        selection: &dyn Selection,
        clause: &SelectionClause,
    ) -> CacheEntry {
        if !self.enabled {
            return CacheEntry::Unindexable;
        }
        let Some(source) = clause.source.as_ref() else {
            return CacheEntry::Unindexable;
        };

        // A change of clause lineage starts a new epoch.
        if let Some(state) = &self.active {
            if state.source() != source {
                debug!(%source, "active clause source changed, clearing cube cache");
                self.clear();
            }
        }

        let state = self.active.get_or_insert_with(|| match analyze_active(clause) {
            Some(active) => ActiveState::Columns(active),
            None => ActiveState::Unindexable {
                source: source.clone(),
            },
        });
        let active = match state {
            ActiveState::Columns(active) => active.clone(),
            ActiveState::Unindexable { .. } => return CacheEntry::Unindexable,
        };

        if let Some(entry) = self.entries.get(&client.id()) {
            return entry.clone();
        }

        let entry = match client.index_columns() {
            None => CacheEntry::Unindexable,
            Some(index_cols) => {
                if selection.skip(client, clause) {
                    CacheEntry::Skip
                } else {
                    let filter = selection.predicate_without(client, source);
                    let query = client.query(filter);
                    let plan = plan_cube(query, &active, &index_cols, &self.schema);

                    debug!(table = %plan.table, "materializing data cube");
                    let statements = vec![
                        create_schema(&self.schema),
                        create_table_as(&plan.table, &plan.create, CreateOptions {
                            temp: false,
                            ..Default::default()
                        }),
                    ];
                    let handle = self.coordinator.exec(statements);
                    let coordinator = Arc::clone(&self.coordinator);
                    handle.on_error(move |err| coordinator.log_error(err));

                    CacheEntry::Built(Arc::new(CubeInfo::new(plan, active, handle)))
                }
            }
        };
        self.entries.insert(client.id(), entry.clone());
        entry
    }
}

impl std::fmt::Debug for CubeIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeIndexer")
            .field("schema", &self.schema)
            .field("enabled", &self.enabled)
            .field("cached_clients", &self.entries.len())
            .finish_non_exhaustive()
    }
}
