//! SQLite storage implementation
//!
//! One database holds the session catalog plus one frontier table per session.
//! All access goes through a single connection behind a mutex, which is what gives
//! frontier reads their read-after-write consistency.

use crate::state::{SessionStatus, StopReason};
use crate::storage::frontier::SqliteFrontier;
use crate::storage::schema::{frontier_table_sql, initialize_schema};
use crate::storage::traits::{FrontierStore, FrontierTables, StoreError, StoreResult};
use crate::storage::{SessionKey, SessionRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SESSION_COLUMNS: &str = "session_key, seed_url, fingerprint, created_at, created_epoch,
     status, waves, stop_reason, error_message, finished_at";

/// SQLite storage backend
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(Database)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ===== Session Catalog =====

    /// Reserves a session key in the catalog
    ///
    /// If `base` is already taken (same host within the same second), the first
    /// free `base_1`, `base_2`, … is used instead. The reserved session starts in
    /// [`SessionStatus::Provisioning`].
    pub fn reserve_session(
        &self,
        base: &SessionKey,
        seed_url: &str,
        fingerprint: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<SessionKey> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut candidate = base.clone();
        let mut suffix = 0;
        loop {
            let taken: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM sessions WHERE session_key = ?1",
                    params![candidate.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_none() {
                break;
            }
            suffix += 1;
            candidate = base.with_suffix(suffix);
        }

        tx.execute(
            "INSERT INTO sessions (session_key, seed_url, fingerprint, created_at, created_epoch, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                candidate.as_str(),
                seed_url,
                fingerprint,
                created_at.to_rfc3339(),
                created_at.timestamp(),
                SessionStatus::Provisioning.to_db_string()
            ],
        )?;
        tx.commit()?;

        Ok(candidate)
    }

    /// Gets a session by key
    pub fn get_session(&self, key: &SessionKey) -> StoreResult<Option<SessionRecord>> {
        let conn = self.lock()?;
        let session = conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE session_key = ?1", SESSION_COLUMNS),
                params![key.as_str()],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Finds the newest session created for a task fingerprint at or after `since_epoch`
    pub fn find_recent_session(
        &self,
        fingerprint: &str,
        since_epoch: i64,
    ) -> StoreResult<Option<SessionRecord>> {
        let conn = self.lock()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {} FROM sessions WHERE fingerprint = ?1 AND created_epoch >= ?2
                     ORDER BY created_epoch DESC, session_key DESC LIMIT 1",
                    SESSION_COLUMNS
                ),
                params![fingerprint, since_epoch],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Lists all sessions, newest first
    pub fn list_sessions(&self) -> StoreResult<Vec<SessionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions ORDER BY created_epoch DESC, session_key DESC",
            SESSION_COLUMNS
        ))?;

        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Updates the status of a session
    pub fn update_session_status(
        &self,
        key: &SessionKey,
        status: SessionStatus,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE sessions SET status = ?1 WHERE session_key = ?2",
            params![status.to_db_string(), key.as_str()],
        )?;
        if updated == 0 {
            return Err(StoreError::SessionNotFound(key.to_string()));
        }
        Ok(())
    }

    /// Records that a session's workflow reached Done
    pub fn complete_session(
        &self,
        key: &SessionKey,
        waves: u32,
        stop_reason: StopReason,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sessions SET status = ?1, waves = ?2, stop_reason = ?3, finished_at = ?4
             WHERE session_key = ?5",
            params![
                SessionStatus::Completed.to_db_string(),
                waves,
                stop_reason.to_db_string(),
                now,
                key.as_str()
            ],
        )?;
        Ok(())
    }

    /// Records that a session failed during provisioning or crawling
    pub fn fail_session(&self, key: &SessionKey, waves: u32, error: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sessions SET status = ?1, waves = ?2, error_message = ?3, finished_at = ?4
             WHERE session_key = ?5",
            params![
                SessionStatus::Failed.to_db_string(),
                waves,
                error,
                now,
                key.as_str()
            ],
        )?;
        Ok(())
    }
}

impl FrontierTables for Database {
    fn create_table(&self, key: &SessionKey) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(&frontier_table_sql(key))?;
        tracing::debug!("Created frontier table {}", key);
        Ok(())
    }

    fn table_ready(&self, key: &SessionKey) -> StoreResult<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn open_frontier(&self, key: &SessionKey) -> StoreResult<Box<dyn FrontierStore>> {
        if !self.table_ready(key)? {
            return Err(StoreError::TableNotFound(key.to_string()));
        }
        Ok(Box::new(SqliteFrontier::new(
            Arc::clone(&self.conn),
            key.clone(),
        )))
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let raw_key: String = row.get(0)?;
    let session_key = SessionKey::parse(&raw_key).map_err(|e| conversion_failure(0, e))?;

    let raw_status: String = row.get(5)?;
    let status = SessionStatus::from_db_string(&raw_status).ok_or_else(|| {
        conversion_failure(
            5,
            StoreError::UnrecognizedValue {
                column: "status",
                value: raw_status.clone(),
            },
        )
    })?;

    let stop_reason = match row.get::<_, Option<String>>(7)? {
        Some(raw) => Some(StopReason::from_db_string(&raw).ok_or_else(|| {
            conversion_failure(
                7,
                StoreError::UnrecognizedValue {
                    column: "stop_reason",
                    value: raw.clone(),
                },
            )
        })?),
        None => None,
    };

    Ok(SessionRecord {
        session_key,
        seed_url: row.get(1)?,
        fingerprint: row.get(2)?,
        created_at: row.get(3)?,
        created_epoch: row.get(4)?,
        status,
        waves: row.get(6)?,
        stop_reason,
        error_message: row.get(8)?,
        finished_at: row.get(9)?,
    })
}

fn conversion_failure(column: usize, error: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserve(db: &Database, key: &SessionKey, epoch: i64) -> SessionKey {
        let created_at = DateTime::from_timestamp(epoch, 0).unwrap();
        db.reserve_session(key, "https://example.com/", "fp", created_at)
            .unwrap()
    }

    #[test]
    fn test_create_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_reserve_session() {
        let db = Database::open_in_memory().unwrap();
        let key = SessionKey::derive("example.com", 100);

        let reserved = reserve(&db, &key, 100);
        assert_eq!(reserved, key);

        let record = db.get_session(&reserved).unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Provisioning);
        assert_eq!(record.seed_url, "https://example.com/");
        assert_eq!(record.created_epoch, 100);
    }

    #[test]
    fn test_reserve_session_suffixes_taken_key() {
        let db = Database::open_in_memory().unwrap();
        let key = SessionKey::derive("example.com", 100);

        let first = reserve(&db, &key, 100);
        let second = reserve(&db, &key, 100);
        let third = reserve(&db, &key, 100);

        assert_eq!(first, key);
        assert_eq!(second, key.with_suffix(1));
        assert_eq!(third, key.with_suffix(2));
    }

    #[test]
    fn test_find_recent_session_respects_window() {
        let db = Database::open_in_memory().unwrap();
        let key = SessionKey::derive("example.com", 100);
        reserve(&db, &key, 100);

        assert!(db.find_recent_session("fp", 50).unwrap().is_some());
        assert!(db.find_recent_session("fp", 101).unwrap().is_none());
        assert!(db.find_recent_session("other", 0).unwrap().is_none());
    }

    #[test]
    fn test_status_transitions() {
        let db = Database::open_in_memory().unwrap();
        let key = reserve(&db, &SessionKey::derive("example.com", 1), 1);

        db.update_session_status(&key, SessionStatus::Running)
            .unwrap();
        db.complete_session(&key, 3, StopReason::FrontierExhausted)
            .unwrap();

        let record = db.get_session(&key).unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.waves, 3);
        assert_eq!(record.stop_reason, Some(StopReason::FrontierExhausted));
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn test_update_unknown_session() {
        let db = Database::open_in_memory().unwrap();
        let key = SessionKey::derive("nowhere.com", 1);
        let result = db.update_session_status(&key, SessionStatus::Running);
        assert!(matches!(result, Err(StoreError::SessionNotFound(_))));
    }

    #[test]
    fn test_fail_session_records_error() {
        let db = Database::open_in_memory().unwrap();
        let key = reserve(&db, &SessionKey::derive("example.com", 1), 1);

        db.fail_session(&key, 0, "table never became ready").unwrap();

        let record = db.get_session(&key).unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Failed);
        assert_eq!(
            record.error_message.as_deref(),
            Some("table never became ready")
        );
    }

    #[test]
    fn test_find_recent_session_prefers_newest() {
        let db = Database::open_in_memory().unwrap();
        reserve(&db, &SessionKey::derive("example.com", 1), 1);
        let newer = reserve(&db, &SessionKey::derive("example.com", 5), 5);

        let latest = db.find_recent_session("fp", 0).unwrap().unwrap();
        assert_eq!(latest.session_key, newer);
        assert_eq!(db.list_sessions().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_status_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let key = reserve(&db, &SessionKey::derive("example.com", 1), 1);
        db.lock()
            .unwrap()
            .execute(
                "UPDATE sessions SET status = 'exploded' WHERE session_key = ?1",
                params![key.as_str()],
            )
            .unwrap();

        let result = db.get_session(&key);
        assert!(matches!(
            result,
            Err(StoreError::Sqlite(rusqlite::Error::FromSqlConversionFailure(5, _, _)))
        ));
        assert!(db.list_sessions().is_err());
    }

    #[test]
    fn test_table_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let key = SessionKey::derive("example.com", 1);

        assert!(!db.table_ready(&key).unwrap());
        assert!(matches!(
            db.open_frontier(&key),
            Err(StoreError::TableNotFound(_))
        ));

        db.create_table(&key).unwrap();
        assert!(db.table_ready(&key).unwrap());
        assert!(db.open_frontier(&key).is_ok());
    }
}
