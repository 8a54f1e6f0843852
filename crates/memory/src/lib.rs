//! `ah-memory` — the persistent memory tool.
//!
//! Backs the agent's keyed, categorized value store outside the message
//! window: `{store, retrieve, search, list, clear}`, SQLite-backed
//! (`rusqlite`, bundled), one connection per process serialized internally.

pub mod store;
pub mod tool;
pub mod types;

pub use store::MemoryStore;
pub use tool::MemoryTool;
pub use types::{CategoryCount, ClearResult, ListResult, MemoryEntry};
