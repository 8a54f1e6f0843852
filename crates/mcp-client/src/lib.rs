//! `ah-mcp-client` — remote tool client (Model Context Protocol transport).
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types for communicating with MCP servers.
//! - A stdio transport that spawns child processes and communicates over stdin/stdout.
//! - An `McpManager` that manages connections to multiple MCP servers and
//!   orchestrates tool discovery and dispatch.
//! - `McpToolProxy`, which wraps a single remote tool as an
//!   `ah_domain::tool::Tool` so it can sit in the same registry as local
//!   tools.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ah_mcp_client::{McpConfig, McpManager, proxy};
//!
//! let config: McpConfig = /* from TOML */;
//! let manager = std::sync::Arc::new(McpManager::from_config(&config).await);
//!
//! // Wrap every discovered tool as a registry-ready Tool.
//! for proxy in proxy::proxies_for(&manager) {
//!     println!("{} (source {})", proxy.qualified_name(), proxy.source());
//! }
//! ```

pub mod config;
pub mod manager;
pub mod protocol;
pub mod proxy;
pub mod transport;

// Re-exports for convenience.
pub use config::{McpConfig, McpServerConfig, McpTransportKind};
pub use manager::{McpError, McpManager};
pub use protocol::McpToolDef;
pub use proxy::McpToolProxy;
