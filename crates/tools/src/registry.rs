//! Tool registry — name → `(tool, source)`, with atomic revocation by source.
//!
//! Sourcing lets a remote MCP server disconnect and take exactly its tools
//! with it, without disturbing locally-registered ones.

use std::collections::HashMap;
use std::sync::Arc;

use ah_domain::tool::{Tool, ToolDefinition};
use parking_lot::RwLock;

struct Entry {
    tool: Arc<dyn Tool>,
    source: String,
}

/// Summary of a registered tool, for listing/introspection.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub source: String,
}

/// Live collection of registered tools.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Register a tool under `source`. No-op if the name is already taken.
    pub fn add(&self, tool: Arc<dyn Tool>, source: impl Into<String>) {
        let mut entries = self.entries.write();
        let name = tool.name().to_owned();
        entries.entry(name).or_insert_with(|| Entry { tool, source: source.into() });
    }

    /// Remove every tool registered under exactly this source tag.
    pub fn remove_by_source(&self, tag: &str) {
        self.entries.write().retain(|_, e| e.source != tag);
    }

    /// Remove every tool whose source starts with `prefix`.
    pub fn remove_by_source_prefix(&self, prefix: &str) {
        self.entries.write().retain(|_, e| !e.source.starts_with(prefix));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.read().get(name).map(|e| e.tool.clone())
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.entries
            .read()
            .values()
            .map(|e| ToolInfo {
                name: e.tool.name().to_owned(),
                description: e.tool.definition().description,
                source: e.source.clone(),
            })
            .collect()
    }

    /// Schemas for every currently-registered tool, in the wire shape `think`
    /// submits to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.read().values().map(|e| e.tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
