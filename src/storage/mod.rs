//! Storage module for persisting crawl sessions and their frontiers
//!
//! This module handles all database operations for the crawler, including:
//! - The session catalog (one row per crawl session)
//! - Provisioning one dedicated frontier table per session
//! - Idempotent frontier writes and bounded unvisited queries

mod frontier;
mod schema;
mod session_key;
mod sqlite;
mod traits;

pub use frontier::SqliteFrontier;
pub use session_key::SessionKey;
pub use sqlite::Database;
pub use traits::{FrontierStore, FrontierTables, StoreError, StoreResult};

use crate::state::{FrontierStatus, SessionStatus, StopReason};

/// One URL in a session's frontier, keyed by `(status, url)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrontierEntry {
    pub status: FrontierStatus,
    pub url: String,
}

impl FrontierEntry {
    pub fn not_visited(url: impl Into<String>) -> Self {
        Self {
            status: FrontierStatus::NotVisited,
            url: url.into(),
        }
    }

    pub fn visited(url: impl Into<String>) -> Self {
        Self {
            status: FrontierStatus::Visited,
            url: url.into(),
        }
    }
}

/// Represents a crawl session in the catalog
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_key: SessionKey,
    pub seed_url: String,
    pub fingerprint: String,
    pub created_at: String,
    pub created_epoch: i64,
    pub status: SessionStatus,
    pub waves: u32,
    pub stop_reason: Option<StopReason>,
    pub error_message: Option<String>,
    pub finished_at: Option<String>,
}
