//! Database schema definitions
//!
//! The catalog lives in fixed tables; every crawl session additionally gets its
//! own frontier table, created on demand from [`frontier_table_sql`].

use crate::storage::SessionKey;

/// SQL schema for the session catalog
pub const CATALOG_SCHEMA_SQL: &str = r#"
-- Track crawl sessions
CREATE TABLE IF NOT EXISTS sessions (
    session_key TEXT PRIMARY KEY,
    seed_url TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_epoch INTEGER NOT NULL,
    status TEXT NOT NULL,
    waves INTEGER NOT NULL DEFAULT 0,
    stop_reason TEXT,
    error_message TEXT,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_fingerprint ON sessions(fingerprint, created_epoch);
CREATE INDEX IF NOT EXISTS idx_sessions_seed ON sessions(seed_url);
"#;

/// Builds the DDL for one session's frontier table
///
/// `status` is the partition discriminator and `url` the unique sort key within it,
/// so a bounded query on one status never scans the other partition.
pub fn frontier_table_sql(key: &SessionKey) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{}" (
    status TEXT NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY (status, url)
) WITHOUT ROWID;"#,
        key.as_str()
    )
}

/// Initializes the catalog schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CATALOG_SCHEMA_SQL)?;
    Ok(())
}
