//! Tool-search tool — keeps the model's initial tool context small by
//! letting it discover the rest on demand.

use std::sync::Arc;

use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

use crate::registry::ToolRegistry;

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default)]
    detail: Detail,
}

fn default_max_results() -> usize {
    8
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Detail {
    #[default]
    Names,
    Schemas,
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn score(tokens: &[String], haystack: &str) -> usize {
    let haystack = haystack.to_lowercase();
    tokens.iter().filter(|t| haystack.contains(t.as_str())).count()
}

/// Searches a live [`ToolRegistry`] by substring match of a tokenized query
/// against each tool's `name + description`.
pub struct ToolSearchTool {
    registry: Arc<ToolRegistry>,
}

impl ToolSearchTool {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Tool for ToolSearchTool {
    fn name(&self) -> &str {
        "tool_search"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Search available tools by name/description to load only the \
                tools needed for the current task. Returns matching tool names and short \
                descriptions; can optionally return schemas."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Capability needed."},
                    "max_results": {"type": "integer", "default": 8},
                    "detail": {"type": "string", "enum": ["names", "schemas"], "default": "names"},
                },
                "required": ["query"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: SearchRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        let query = req.query.trim();
        if query.is_empty() {
            return Err(Error::ToolArgumentInvalid { tool: self.name().into(), message: "query is required".into() });
        }

        let tokens = tokenize(query);
        let mut scored: Vec<(usize, ToolDefinition)> = self
            .registry
            .list()
            .into_iter()
            .filter(|t| t.name != self.name())
            .map(|t| {
                let haystack = format!("{} {}", t.name, t.description);
                (score(&tokens, &haystack), t)
            })
            .filter(|(s, _)| *s > 0)
            .map(|(s, t)| {
                (
                    s,
                    ToolDefinition { name: t.name, description: t.description, parameters: serde_json::Value::Null },
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let max_results = req.max_results.max(1);

        let defs = if req.detail == Detail::Schemas {
            // Re-fetch full schemas for the winners.
            scored
                .into_iter()
                .take(max_results)
                .filter_map(|(_, d)| self.registry.get(&d.name))
                .map(|t| t.definition())
                .collect::<Vec<_>>()
        } else {
            scored.into_iter().take(max_results).map(|(_, d)| d).collect()
        };

        let matches: Vec<serde_json::Value> = defs
            .into_iter()
            .map(|d| {
                if req.detail == Detail::Schemas {
                    serde_json::json!({"name": d.name, "description": d.description, "schema": d.parameters})
                } else {
                    serde_json::json!({"name": d.name, "description": d.description})
                }
            })
            .collect();

        let payload = serde_json::json!({
            "query": query,
            "count": matches.len(),
            "matches": matches,
            "note": "Call tool_search whenever you need a capability not in your current \
                tool list. Returned tools become available in the next step.",
        });

        Ok(serde_json::to_string_pretty(&payload).unwrap_or_default())
    }
}
