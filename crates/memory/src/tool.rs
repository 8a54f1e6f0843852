//! The persistent memory tool: exposes `{store, retrieve, search, list,
//! clear}` actions over a [`MemoryStore`] as an `ah_domain::tool::Tool`.

use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::MemoryStore;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const DEFAULT_LIST_LIMIT: usize = 50;

pub struct MemoryTool {
    store: MemoryStore,
}

impl MemoryTool {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Store { key: String, value: String, category: Option<String> },
    Retrieve { key: String },
    Search { query: String, limit: Option<usize> },
    List { category: Option<String>, limit: Option<usize> },
    Clear { key: Option<String>, category: Option<String> },
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "memory"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "memory".into(),
            description: "Persistent keyed memory outside the context window. \
                Actions: store (key, value, category?), retrieve (key), \
                search (query, limit?), list (category?, limit?), clear (key? or category?, clears all if neither given).\n\
                1. Remember a fact across the whole session.\n\
                   Input: {\"action\": \"store\", \"key\": \"fav_lang\", \"value\": \"Rust\", \"category\": \"preferences\"}\n\
                2. Look up a fact without scanning the transcript.\n\
                   Input: {\"action\": \"retrieve\", \"key\": \"fav_lang\"}\n\
                   Output: {\"key\": \"fav_lang\", \"value\": \"Rust\", ...}"
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["store", "retrieve", "search", "list", "clear"]},
                    "key": {"type": "string"},
                    "value": {"type": "string"},
                    "category": {"type": "string"},
                    "query": {"type": "string"},
                    "limit": {"type": "integer"}
                },
                "required": ["action"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let action: Action = serde_json::from_value(arguments).map_err(|e| Error::ToolArgumentInvalid {
            tool: "memory".into(),
            message: e.to_string(),
        })?;

        let result = match action {
            Action::Store { key, value, category } => {
                let entry = self.store.store(&key, &value, category.as_deref())?;
                json!(entry)
            }
            Action::Retrieve { key } => match self.store.retrieve(&key)? {
                Some(entry) => json!(entry),
                None => json!({ "found": false, "key": key }),
            },
            Action::Search { query, limit } => {
                let entries = self.store.search(&query, limit.unwrap_or(DEFAULT_SEARCH_LIMIT))?;
                json!({ "query": query, "results": entries })
            }
            Action::List { category, limit } => {
                let result = self.store.list(category.as_deref(), limit.unwrap_or(DEFAULT_LIST_LIMIT))?;
                json!(result)
            }
            Action::Clear { key, category } => {
                let result = self.store.clear(key.as_deref(), category.as_deref())?;
                json!(result)
            }
        };

        serde_json::to_string(&result).map_err(Error::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> MemoryTool {
        MemoryTool::new(MemoryStore::in_memory().unwrap())
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let tool = tool();
        tool.execute(json!({"action": "store", "key": "k", "value": "v"})).await.unwrap();
        let raw = tool.execute(json!({"action": "retrieve", "key": "k"})).await.unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["value"], "v");
    }

    #[tokio::test]
    async fn retrieve_missing_key_reports_not_found() {
        let tool = tool();
        let raw = tool.execute(json!({"action": "retrieve", "key": "nope"})).await.unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["found"], false);
    }

    #[tokio::test]
    async fn unknown_action_is_argument_error() {
        let tool = tool();
        let err = tool.execute(json!({"action": "frobnicate"})).await.unwrap_err();
        assert!(matches!(err, Error::ToolArgumentInvalid { .. }));
    }

    #[tokio::test]
    async fn clear_with_no_filters_clears_everything() {
        let tool = tool();
        tool.execute(json!({"action": "store", "key": "a", "value": "1"})).await.unwrap();
        tool.execute(json!({"action": "store", "key": "b", "value": "2"})).await.unwrap();

        let raw = tool.execute(json!({"action": "clear"})).await.unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["removed"], 2);
    }
}
