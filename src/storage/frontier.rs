//! SQLite-backed frontier for one crawl session

use crate::state::FrontierStatus;
use crate::storage::traits::{FrontierStore, StoreError, StoreResult};
use crate::storage::{FrontierEntry, SessionKey};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// Frontier handle scoped to a single session table
///
/// Obtained through [`crate::storage::FrontierTables::open_frontier`]. Holds only the
/// shared connection and the table name; it carries no crawl state of its own.
pub struct SqliteFrontier {
    conn: Arc<Mutex<Connection>>,
    table: SessionKey,
}

impl SqliteFrontier {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>, table: SessionKey) -> Self {
        Self { conn, table }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl FrontierStore for SqliteFrontier {
    fn put(&self, entry: &FrontierEntry) -> StoreResult<()> {
        match entry.status {
            FrontierStatus::Visited => self.mark_visited(&entry.url),
            FrontierStatus::NotVisited => {
                let conn = self.lock()?;
                conn.execute(
                    &format!(
                        r#"INSERT OR IGNORE INTO "{table}" (status, url)
                           SELECT ?1, ?2
                           WHERE NOT EXISTS (SELECT 1 FROM "{table}" WHERE status = ?3 AND url = ?2)"#,
                        table = self.table.as_str()
                    ),
                    params![
                        FrontierStatus::NotVisited.to_db_string(),
                        entry.url,
                        FrontierStatus::Visited.to_db_string()
                    ],
                )?;
                Ok(())
            }
        }
    }

    fn query_unvisited(&self, limit: usize) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT url FROM "{}" WHERE status = ?1 ORDER BY url ASC LIMIT ?2"#,
            self.table.as_str()
        ))?;

        let urls = stmt
            .query_map(
                params![FrontierStatus::NotVisited.to_db_string(), limit as i64],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    fn mark_visited(&self, url: &str) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                r#"DELETE FROM "{}" WHERE status = ?1 AND url = ?2"#,
                self.table.as_str()
            ),
            params![FrontierStatus::NotVisited.to_db_string(), url],
        )?;
        tx.execute(
            &format!(
                r#"INSERT OR IGNORE INTO "{}" (status, url) VALUES (?1, ?2)"#,
                self.table.as_str()
            ),
            params![FrontierStatus::Visited.to_db_string(), url],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn count(&self, status: FrontierStatus) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!(
                r#"SELECT COUNT(*) FROM "{}" WHERE status = ?1"#,
                self.table.as_str()
            ),
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, FrontierTables};

    fn frontier() -> Box<dyn FrontierStore> {
        let db = Database::open_in_memory().unwrap();
        let key = SessionKey::derive("example.com", 1);
        db.create_table(&key).unwrap();
        db.open_frontier(&key).unwrap()
    }

    #[test]
    fn test_put_is_idempotent() {
        let frontier = frontier();
        let entry = FrontierEntry::not_visited("https://example.com/a");

        frontier.put(&entry).unwrap();
        frontier.put(&entry).unwrap();

        assert_eq!(frontier.count(FrontierStatus::NotVisited).unwrap(), 1);
        assert_eq!(
            frontier.query_unvisited(10).unwrap(),
            vec!["https://example.com/a".to_string()]
        );
    }

    #[test]
    fn test_mark_visited_removes_from_unvisited() {
        let frontier = frontier();
        frontier
            .put(&FrontierEntry::not_visited("https://example.com/a"))
            .unwrap();

        frontier.mark_visited("https://example.com/a").unwrap();

        assert!(frontier.query_unvisited(10).unwrap().is_empty());
        assert_eq!(frontier.count(FrontierStatus::Visited).unwrap(), 1);
        assert_eq!(frontier.count(FrontierStatus::NotVisited).unwrap(), 0);
    }

    #[test]
    fn test_mark_visited_is_idempotent() {
        let frontier = frontier();
        frontier
            .put(&FrontierEntry::not_visited("https://example.com/a"))
            .unwrap();

        frontier.mark_visited("https://example.com/a").unwrap();
        frontier.mark_visited("https://example.com/a").unwrap();

        assert_eq!(frontier.count(FrontierStatus::Visited).unwrap(), 1);
    }

    #[test]
    fn test_mark_visited_unknown_url() {
        let frontier = frontier();
        frontier.mark_visited("https://example.com/never-queued").unwrap();
        assert_eq!(frontier.count(FrontierStatus::Visited).unwrap(), 1);
    }

    #[test]
    fn test_query_empty_partition_is_not_an_error() {
        let frontier = frontier();
        assert_eq!(frontier.query_unvisited(10).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_query_respects_limit_and_is_stable() {
        let frontier = frontier();
        for i in 0..25 {
            frontier
                .put(&FrontierEntry::not_visited(format!(
                    "https://example.com/{:02}",
                    i
                )))
                .unwrap();
        }

        let first = frontier.query_unvisited(10).unwrap();
        let again = frontier.query_unvisited(10).unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(first, again);
        assert_eq!(first[0], "https://example.com/00");
    }

    #[test]
    fn test_rediscovered_visited_url_stays_visited() {
        let frontier = frontier();
        frontier
            .put(&FrontierEntry::not_visited("https://example.com/"))
            .unwrap();
        frontier.mark_visited("https://example.com/").unwrap();

        frontier
            .put(&FrontierEntry::not_visited("https://example.com/"))
            .unwrap();

        assert!(frontier.query_unvisited(10).unwrap().is_empty());
        assert_eq!(frontier.count(FrontierStatus::Visited).unwrap(), 1);
    }

    #[test]
    fn test_put_visited_moves_entry() {
        let frontier = frontier();
        frontier
            .put(&FrontierEntry::not_visited("https://example.com/a"))
            .unwrap();

        frontier
            .put(&FrontierEntry::visited("https://example.com/a"))
            .unwrap();

        assert_eq!(frontier.count(FrontierStatus::NotVisited).unwrap(), 0);
        assert_eq!(frontier.count(FrontierStatus::Visited).unwrap(), 1);
    }

    #[test]
    fn test_sessions_do_not_share_frontiers() {
        let db = Database::open_in_memory().unwrap();
        let first = SessionKey::derive("example.com", 1);
        let second = SessionKey::derive("example.com", 2);
        db.create_table(&first).unwrap();
        db.create_table(&second).unwrap();

        db.open_frontier(&first)
            .unwrap()
            .put(&FrontierEntry::not_visited("https://example.com/"))
            .unwrap();

        let other = db.open_frontier(&second).unwrap();
        assert!(other.query_unvisited(10).unwrap().is_empty());
    }
}
