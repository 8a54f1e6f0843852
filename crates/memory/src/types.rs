//! Typed records for the persistent memory store.

use serde::{Deserialize, Serialize};

/// A single persisted entry: `{ key (unique), value, category?, created_at,
/// updated_at, access_count }`, as read back from SQLite row-by-row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: String,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub access_count: i64,
}

/// Per-category entry counts, returned by `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// `list` result: matching entries plus the category breakdown across the
/// whole store (not just the filtered set), so callers can see what else is
/// available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult {
    pub entries: Vec<MemoryEntry>,
    pub categories: Vec<CategoryCount>,
}

/// `clear` result: how many rows were removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResult {
    pub removed: u64,
}
