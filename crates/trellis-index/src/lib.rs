//! Data cube indexer for the trellis system.
//!
//! Accelerates interactive cross-filtering by materializing pre-aggregated
//! cube tables, one per (client, active clause) pair, so that filter updates
//! re-aggregate a small cube instead of re-scanning base tables. The
//! top-level entry point is [`CubeIndexer::index`]; the coordinator, client
//! and selection collaborators are consumed through the traits in
//! [`coordinator`], [`client`] and [`selection`].

pub mod active;
pub mod bin;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod indexer;
pub mod plan;
pub mod pushdown;
pub mod selection;

// Re-exports for convenience.
pub use active::{ActiveColumns, PredicateScheme, analyze_active};
pub use bin::BinExpr;
pub use client::{ClientId, DataCubeClient, IndexColumns, derive_index_columns};
pub use coordinator::{Coordinator, ExecError, ExecHandle};
pub use error::IndexError;
pub use indexer::{CacheEntry, CubeIndexer, IndexerOptions};
pub use plan::CubeInfo;
pub use pushdown::push_down_columns;
pub use selection::Selection;
