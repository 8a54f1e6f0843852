//! SQLite-backed persistent memory store.
//!
//! Schema: `memories(key PRIMARY KEY, value TEXT NOT NULL, category TEXT,
//! created_at TEXT, updated_at TEXT, access_count INTEGER)`, indexed on
//! `category` and `updated_at`. Timestamps are ISO-8601. The table and
//! indexes are created on first open (`CREATE TABLE IF NOT EXISTS`).
//!
//! The store owns a single connection and serializes access with its own
//! mutex — callers never need external locking.

use std::path::Path;
use std::sync::Arc;

use ah_domain::error::{Error, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::types::{CategoryCount, ClearResult, ListResult, MemoryEntry};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    category TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
CREATE INDEX IF NOT EXISTS idx_memories_updated_at ON memories(updated_at);
";

#[derive(Clone)]
pub struct MemoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl MemoryStore {
    /// Open (creating if absent) the SQLite database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(Error::Io)?;
            }
        }
        let conn = Connection::open(path).map_err(|e| Error::Other(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// An in-memory store, useful for tests and sub-agents that shouldn't
    /// persist to disk.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Other(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Insert or update an entry. Idempotent: a repeated `store` with the
    /// same key updates `value` and `updated_at` but preserves `created_at`
    /// and `access_count`.
    pub fn store(&self, key: &str, value: &str, category: Option<&str>) -> Result<MemoryEntry> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO memories (key, value, category, created_at, updated_at, access_count)
             VALUES (?1, ?2, ?3, ?4, ?4, 0)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                category = excluded.category,
                updated_at = excluded.updated_at",
            params![key, value, category, now],
        )
        .map_err(|e| Error::Other(e.to_string()))?;

        row_by_key(&conn, key)?.ok_or_else(|| Error::Other("store: row vanished after insert".into()))
    }

    /// Fetch an entry by key, bumping `access_count` on hit.
    pub fn retrieve(&self, key: &str) -> Result<Option<MemoryEntry>> {
        let conn = self.conn.lock();
        let Some(entry) = row_by_key(&conn, key)? else {
            return Ok(None);
        };
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1 WHERE key = ?1",
            params![key],
        )
        .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Some(MemoryEntry { access_count: entry.access_count + 1, ..entry }))
    }

    /// Substring match against key and value, most recently updated first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryEntry>> {
        let conn = self.conn.lock();
        let needle = format!("%{}%", escape_like(query));
        let mut stmt = conn
            .prepare(
                "SELECT key, value, category, created_at, updated_at, access_count
                 FROM memories
                 WHERE key LIKE ?1 ESCAPE '\\' OR value LIKE ?1 ESCAPE '\\'
                 ORDER BY updated_at DESC
                 LIMIT ?2",
            )
            .map_err(|e| Error::Other(e.to_string()))?;

        let rows = stmt
            .query_map(params![needle, limit as i64], row_to_entry)
            .map_err(|e| Error::Other(e.to_string()))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Other(e.to_string()))
    }

    /// List entries, optionally filtered by category, plus the category
    /// breakdown across the whole store.
    pub fn list(&self, category: Option<&str>, limit: usize) -> Result<ListResult> {
        let conn = self.conn.lock();

        let entries = if let Some(cat) = category {
            let mut stmt = conn
                .prepare(
                    "SELECT key, value, category, created_at, updated_at, access_count
                     FROM memories WHERE category = ?1 ORDER BY updated_at DESC LIMIT ?2",
                )
                .map_err(|e| Error::Other(e.to_string()))?;
            stmt.query_map(params![cat, limit as i64], row_to_entry)
                .map_err(|e| Error::Other(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Other(e.to_string()))?
        } else {
            let mut stmt = conn
                .prepare(
                    "SELECT key, value, category, created_at, updated_at, access_count
                     FROM memories ORDER BY updated_at DESC LIMIT ?1",
                )
                .map_err(|e| Error::Other(e.to_string()))?;
            stmt.query_map(params![limit as i64], row_to_entry)
                .map_err(|e| Error::Other(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Other(e.to_string()))?
        };

        let mut stmt = conn
            .prepare(
                "SELECT COALESCE(category, '(none)'), COUNT(*) FROM memories GROUP BY category",
            )
            .map_err(|e| Error::Other(e.to_string()))?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategoryCount { category: row.get(0)?, count: row.get(1)? })
            })
            .map_err(|e| Error::Other(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(ListResult { entries, categories })
    }

    /// Clear entries by `key`, by `category`, or — when neither is given —
    /// the entire store.
    pub fn clear(&self, key: Option<&str>, category: Option<&str>) -> Result<ClearResult> {
        let conn = self.conn.lock();
        let removed = if let Some(key) = key {
            conn.execute("DELETE FROM memories WHERE key = ?1", params![key])
        } else if let Some(cat) = category {
            conn.execute("DELETE FROM memories WHERE category = ?1", params![cat])
        } else {
            conn.execute("DELETE FROM memories", [])
        }
        .map_err(|e| Error::Other(e.to_string()))?;

        Ok(ClearResult { removed: removed as u64 })
    }
}

fn row_by_key(conn: &Connection, key: &str) -> Result<Option<MemoryEntry>> {
    conn.query_row(
        "SELECT key, value, category, created_at, updated_at, access_count
         FROM memories WHERE key = ?1",
        params![key],
        row_to_entry,
    )
    .optional()
    .map_err(|e| Error::Other(e.to_string()))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryEntry> {
    Ok(MemoryEntry {
        key: row.get(0)?,
        value: row.get(1)?,
        category: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        access_count: row.get(5)?,
    })
}

/// Escape `%` and `_` so a user-supplied search term is treated literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_retrieve_bumps_access_count() {
        let store = MemoryStore::in_memory().unwrap();
        store.store("fav_lang", "Rust", Some("preferences")).unwrap();

        let entry = store.retrieve("fav_lang").unwrap().unwrap();
        assert_eq!(entry.value, "Rust");
        assert_eq!(entry.access_count, 1);

        let entry = store.retrieve("fav_lang").unwrap().unwrap();
        assert_eq!(entry.access_count, 2);
    }

    #[test]
    fn retrieve_missing_key_is_none() {
        let store = MemoryStore::in_memory().unwrap();
        assert!(store.retrieve("nope").unwrap().is_none());
    }

    #[test]
    fn repeated_store_preserves_created_at_and_access_count() {
        let store = MemoryStore::in_memory().unwrap();
        let first = store.store("k", "v1", None).unwrap();
        store.retrieve("k").unwrap();
        let updated = store.store("k", "v2", None).unwrap();

        assert_eq!(updated.created_at, first.created_at);
        assert_eq!(updated.value, "v2");
        assert_eq!(updated.access_count, 1);
    }

    #[test]
    fn search_matches_key_and_value_substrings() {
        let store = MemoryStore::in_memory().unwrap();
        store.store("project_name", "agent-harness", Some("project")).unwrap();
        store.store("unrelated", "nothing here", Some("misc")).unwrap();

        let hits = store.search("harness", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "project_name");
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let store = MemoryStore::in_memory().unwrap();
        store.store("k1", "100% done", None).unwrap();
        store.store("k2", "100x done", None).unwrap();

        let hits = store.search("100%", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "k1");
    }

    #[test]
    fn list_filters_by_category_and_reports_counts() {
        let store = MemoryStore::in_memory().unwrap();
        store.store("a", "1", Some("cat-a")).unwrap();
        store.store("b", "2", Some("cat-a")).unwrap();
        store.store("c", "3", Some("cat-b")).unwrap();

        let all = store.list(None, 100).unwrap();
        assert_eq!(all.entries.len(), 3);
        assert_eq!(all.categories.len(), 2);

        let filtered = store.list(Some("cat-a"), 100).unwrap();
        assert_eq!(filtered.entries.len(), 2);
    }

    #[test]
    fn clear_by_key_category_or_all() {
        let store = MemoryStore::in_memory().unwrap();
        store.store("a", "1", Some("cat-a")).unwrap();
        store.store("b", "2", Some("cat-a")).unwrap();
        store.store("c", "3", Some("cat-b")).unwrap();

        let result = store.clear(Some("a"), None).unwrap();
        assert_eq!(result.removed, 1);
        assert!(store.retrieve("a").unwrap().is_none());

        let result = store.clear(None, Some("cat-a")).unwrap();
        assert_eq!(result.removed, 1);

        let result = store.clear(None, None).unwrap();
        assert_eq!(result.removed, 1);
        assert_eq!(store.list(None, 100).unwrap().entries.len(), 0);
    }
}
