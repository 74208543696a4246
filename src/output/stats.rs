//! Session statistics from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! per-session frontier statistics and the session catalog.

use crate::state::FrontierStatus;
use crate::storage::{Database, FrontierTables, SessionKey, SessionRecord, StoreError};
use crate::CrawlError;
use std::fmt::Write;

/// Frontier statistics for one session
#[derive(Debug, Clone)]
pub struct SessionStatistics {
    /// Catalog row of the session
    pub session: SessionRecord,

    /// URLs whose links have been extracted (or skipped)
    pub visited: u64,

    /// URLs discovered but not yet visited
    pub not_visited: u64,

    /// False when provisioning never created the frontier table
    pub table_present: bool,
}

impl SessionStatistics {
    /// Total URLs the session has discovered, seed included
    pub fn discovered(&self) -> u64 {
        self.visited + self.not_visited
    }
}

/// Loads statistics for one session
///
/// # Arguments
///
/// * `db` - The crawl database
/// * `key` - Session to report on
///
/// # Returns
///
/// * `Ok(SessionStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Unknown session or failed query
pub fn load_statistics(db: &Database, key: &SessionKey) -> Result<SessionStatistics, CrawlError> {
    let session = db
        .get_session(key)?
        .ok_or_else(|| StoreError::SessionNotFound(key.to_string()))?;

    if !db.table_ready(key)? {
        return Ok(SessionStatistics {
            session,
            visited: 0,
            not_visited: 0,
            table_present: false,
        });
    }

    let frontier = db.open_frontier(key)?;
    Ok(SessionStatistics {
        session,
        visited: frontier.count(FrontierStatus::Visited)?,
        not_visited: frontier.count(FrontierStatus::NotVisited)?,
        table_present: true,
    })
}

/// Renders statistics as the text printed by [`print_statistics`]
pub fn render_statistics(stats: &SessionStatistics) -> String {
    let session = &stats.session;
    let mut out = String::new();

    let _ = writeln!(out, "=== Session {} ===\n", session.session_key);
    let _ = writeln!(out, "Seed URL: {}", session.seed_url);
    let _ = writeln!(out, "Status: {}", session.status);
    let _ = writeln!(out, "Created: {}", session.created_at);
    if let Some(finished) = &session.finished_at {
        let _ = writeln!(out, "Finished: {}", finished);
    }
    let _ = writeln!(out, "Waves: {}", session.waves);
    if let Some(reason) = session.stop_reason {
        let _ = writeln!(out, "Stop reason: {}", reason);
    }
    if let Some(error) = &session.error_message {
        let _ = writeln!(out, "Error: {}", error);
    }
    let _ = writeln!(out);

    if !stats.table_present {
        let _ = writeln!(out, "Frontier table was never created");
        return out;
    }

    let discovered = stats.discovered();
    let progress = if discovered > 0 {
        (stats.visited as f64 / discovered as f64) * 100.0
    } else {
        0.0
    };

    let _ = writeln!(out, "Frontier:");
    let _ = writeln!(out, "  Discovered: {}", discovered);
    let _ = writeln!(out, "  Visited: {}", stats.visited);
    let _ = writeln!(out, "  Not visited: {}", stats.not_visited);
    let _ = writeln!(out, "  Progress: {:.1}%", progress);

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &SessionStatistics) {
    print!("{}", render_statistics(stats));
}

/// Prints the session catalog, newest first
pub fn print_sessions(sessions: &[SessionRecord]) {
    if sessions.is_empty() {
        println!("No crawl sessions found");
        return;
    }

    println!("=== Crawl Sessions ({}) ===\n", sessions.len());
    for session in sessions {
        println!(
            "{}  {:<12} waves={:<4} {}",
            session.session_key, session.status, session.waves, session.seed_url
        );
    }
}
