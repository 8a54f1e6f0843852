//! Wraps remote MCP tools as local `ah_domain::tool::Tool` implementations.
//!
//! Each discovered tool is named `<server-id>:<tool-name>` to avoid
//! collisions with local tools or tools from other servers; the registry
//! entry for a proxy carries the source tag `remote:<server-id>` so a
//! disconnect can atomically revoke every tool from that server.

use std::sync::Arc;

use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;

use crate::manager::McpManager;
use crate::protocol::McpToolDef;

/// A single remote tool, proxied through the shared [`McpManager`].
pub struct McpToolProxy {
    manager: Arc<McpManager>,
    server_id: String,
    tool: McpToolDef,
}

impl McpToolProxy {
    pub fn new(manager: Arc<McpManager>, server_id: impl Into<String>, tool: McpToolDef) -> Self {
        Self { manager, server_id: server_id.into(), tool }
    }

    /// The registry source tag for every proxy from this server.
    pub fn source(&self) -> String {
        format!("remote:{}", self.server_id)
    }

    /// The qualified tool name exposed to the model.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.server_id, self.tool.name)
    }
}

/// Build one `McpToolProxy` per tool currently discovered on `manager`,
/// across all connected servers.
pub fn proxies_for(manager: &Arc<McpManager>) -> Vec<McpToolProxy> {
    manager
        .list_tools()
        .into_iter()
        .map(|(server_id, tool)| McpToolProxy::new(manager.clone(), server_id, tool.clone()))
        .collect()
}

#[async_trait]
impl Tool for McpToolProxy {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.qualified_name(),
            description: self.tool.description.clone(),
            parameters: self.tool.input_schema.clone(),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let result = self
            .manager
            .call_tool(&self.server_id, &self.tool.name, arguments)
            .await
            .map_err(|e| Error::ToolExecutionError {
                tool: self.qualified_name(),
                message: e.to_string(),
            })?;

        let text = result
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error {
            return Err(Error::ToolExecutionError { tool: self.qualified_name(), message: text });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_def(name: &str) -> McpToolDef {
        McpToolDef {
            name: name.into(),
            description: "a remote tool".into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn qualified_name_prefixes_server_id() {
        let manager = Arc::new(McpManager::empty());
        let proxy = McpToolProxy::new(manager, "filesystem", tool_def("read_file"));
        assert_eq!(proxy.qualified_name(), "filesystem:read_file");
        assert_eq!(proxy.source(), "remote:filesystem");
    }

    #[test]
    fn proxies_for_empty_manager_is_empty() {
        let manager = Arc::new(McpManager::empty());
        assert!(proxies_for(&manager).is_empty());
    }
}
