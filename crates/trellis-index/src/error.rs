//! Indexer error types.
//!
//! Data-dependent unindexability is never an error -- it flows through
//! `CacheEntry::Unindexable`. Errors here are contract violations surfaced
//! synchronously to the caller.

/// Errors raised by the indexing layer.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A predicate of the wrong shape was handed to a cube query: e.g. a
    /// point predicate against interval-binned active columns, or a brush
    /// with the wrong number of children.
    #[error("predicate shape mismatch: expected {expected}, got {got}")]
    PredicateShape {
        /// What the active columns can consume.
        expected: String,
        /// What the caller supplied.
        got: String,
    },
}

/// Convenience alias used throughout the indexing crate.
pub type Result<T> = std::result::Result<T, IndexError>;
