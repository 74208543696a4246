//! Storage traits and error types
//!
//! This module defines the trait interface for frontier backends and
//! associated error types.

use crate::state::FrontierStatus;
use crate::storage::{FrontierEntry, SessionKey};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Frontier table not found: {0}")]
    TableNotFound(String),

    #[error("Malformed session key: {0}")]
    MalformedSessionKey(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Unrecognized {column} value: {value}")]
    UnrecognizedValue { column: &'static str, value: String },

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One session's frontier
///
/// Implementations must give read-after-write consistency: a `put` or
/// `mark_visited` that has returned is visible to the next `query_unvisited`.
pub trait FrontierStore: Send + Sync {
    /// Idempotent upsert keyed by `(status, url)`
    ///
    /// A `not_visited` entry for a URL that is already visited is ignored, so
    /// visited status never regresses. A `visited` entry behaves like
    /// [`FrontierStore::mark_visited`].
    fn put(&self, entry: &FrontierEntry) -> StoreResult<()>;

    /// Returns up to `limit` URLs from the `not_visited` partition
    ///
    /// An empty result means the frontier is exhausted; it is never an error.
    fn query_unvisited(&self, limit: usize) -> StoreResult<Vec<String>>;

    /// Moves a URL from `not_visited` to `visited`
    ///
    /// Safe to call for URLs that are already visited or were never queued.
    fn mark_visited(&self, url: &str) -> StoreResult<()>;

    /// Counts entries in one partition
    fn count(&self, status: FrontierStatus) -> StoreResult<u64>;
}

/// Provisioning API for per-session frontier tables
pub trait FrontierTables: Send + Sync {
    /// Requests creation of the session's table
    ///
    /// The table may not be usable until [`FrontierTables::table_ready`] says so.
    fn create_table(&self, key: &SessionKey) -> StoreResult<()>;

    /// Returns true once the session's table accepts reads and writes
    fn table_ready(&self, key: &SessionKey) -> StoreResult<bool>;

    /// Resolves a frontier handle from a session key
    ///
    /// Fails with [`StoreError::TableNotFound`] if the table does not exist.
    fn open_frontier(&self, key: &SessionKey) -> StoreResult<Box<dyn FrontierStore>>;
}
