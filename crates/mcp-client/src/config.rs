//! MCP configuration types — re-exported from `ah-domain`.
//!
//! The canonical definitions live in `ah_domain::config` so that the
//! gateway config deserializer can include them without depending on
//! the full MCP client crate.

pub use ah_domain::config::{McpConfig, McpServerConfig, McpTransportKind};
