//! Remote tool server (MCP) configuration types for the domain layer.
//!
//! These are lightweight config structs used to deserialize the `[mcp]`
//! section of the gateway config. The transport/dispatch logic lives in
//! the `ah-mcp-client` crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level remote tool server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfig {
    /// List of remote tool server definitions.
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

/// Configuration for a single remote tool server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique identifier for this server (used in tool naming: `remote:{id}:{tool}`).
    pub id: String,

    /// The command to spawn for the stdio transport (e.g. `"npx"`).
    #[serde(default)]
    pub command: String,

    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Transport type.
    #[serde(default)]
    pub transport: McpTransportKind,

    /// URL for the streaming transport.
    #[serde(default)]
    pub url: Option<String>,

    /// Environment variables to set on the spawned process.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Transport kind for connecting to a remote tool server.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    #[default]
    Stdio,
    Sse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_defaults() {
        let cfg: McpConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.servers.is_empty());
    }

    #[test]
    fn deserialize_server_config() {
        let raw = r#"{
            "id": "filesystem",
            "command": "npx",
            "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
            "transport": "stdio"
        }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.id, "filesystem");
        assert_eq!(cfg.args.len(), 3);
        assert_eq!(cfg.transport, McpTransportKind::Stdio);
    }

    #[test]
    fn transport_kind_defaults_to_stdio() {
        let raw = r#"{ "id": "test", "command": "echo" }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.transport, McpTransportKind::Stdio);
    }

    #[test]
    fn sse_transport() {
        let raw = r#"{ "id": "remote", "transport": "sse", "url": "http://localhost:8080/sse" }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.transport, McpTransportKind::Sse);
        assert_eq!(cfg.url.as_deref(), Some("http://localhost:8080/sse"));
    }
}
