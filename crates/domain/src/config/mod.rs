mod agent;
mod eval;
mod llm;
mod logging;
mod mcp;
mod memory;
mod server;
mod sub_agent;
mod tools;

pub use agent::*;
pub use eval::*;
pub use llm::*;
pub use logging::*;
pub use mcp::*;
pub use memory::*;
pub use server::*;
pub use sub_agent::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sub_agent: SubAgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        // Server port must be non-zero.
        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        // Server host must not be empty.
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        // LLM base_url must not be empty.
        if self.llm.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        }

        // LLM base_url must be a valid URL (http:// or https://).
        if !self.llm.base_url.is_empty()
            && !self.llm.base_url.starts_with("http://")
            && !self.llm.base_url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.base_url".into(),
                message: format!(
                    "base_url must start with http:// or https:// (got \"{}\")",
                    self.llm.base_url
                ),
            });
        }

        // Warn when no model is configured.
        if self.llm.model.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.model".into(),
                message: "no model configured".into(),
            });
        }

        // Auth completeness: modes that require credentials need a non-empty
        // env var name to read the key from.
        let needs_credentials = matches!(self.llm.auth.mode, AuthMode::ApiKey | AuthMode::QueryParam);
        if needs_credentials && self.llm.auth.api_key_env.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.auth.api_key_env".into(),
                message: format!(
                    "auth mode {:?} requires a non-empty api_key_env",
                    self.llm.auth.mode
                ),
            });
        }

        if self.llm.timeout_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.timeout_ms".into(),
                message: "timeout_ms must be greater than 0".into(),
            });
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*" {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        // Validate exec security denied patterns are valid regexes.
        for (i, pattern) in self.tools.exec_security.denied_patterns.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("tools.exec_security.denied_patterns[{i}]"),
                    message: format!("invalid regex \"{pattern}\": {e}"),
                });
            }
        }

        // Memory: warning threshold must be in 1..=100 and below 100.
        if self.memory.warning_threshold_percent == 0 || self.memory.warning_threshold_percent > 100 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "memory.warning_threshold_percent".into(),
                message: "warning_threshold_percent must be between 1 and 100".into(),
            });
        }
        if self.memory.compaction_threshold_tokens == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "memory.compaction_threshold_tokens".into(),
                message: "compaction_threshold_tokens must be greater than 0".into(),
            });
        }
        if self.memory.enabled && self.memory.db_path.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "memory.db_path".into(),
                message: "db_path must not be empty when memory is enabled".into(),
            });
        }

        // ── MCP server validation ─────────────────────────────────────
        let mut seen_mcp_ids: HashSet<&str> = HashSet::new();
        for (i, server) in self.mcp.servers.iter().enumerate() {
            if server.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("mcp.servers[{i}].id"),
                    message: "server id must not be empty".into(),
                });
            }
            if server.id.contains(':') {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("mcp.servers[{i}].id"),
                    message: "server id must not contain ':' (used as tool name delimiter)".into(),
                });
            }
            if server.transport == McpTransportKind::Stdio && server.command.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("mcp.servers[{i}].command"),
                    message: "stdio transport requires a non-empty command".into(),
                });
            }
            if !server.id.is_empty() && !seen_mcp_ids.insert(&server.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("mcp.servers[{i}].id"),
                    message: format!("duplicate MCP server id \"{}\"", server.id),
                });
            }
            // Reject security-sensitive environment variable overrides.
            for key in server.env.keys() {
                if matches!(key.as_str(), "LD_PRELOAD" | "LD_LIBRARY_PATH" | "DYLD_INSERT_LIBRARIES") {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("mcp.servers[{i}].env.{key}"),
                        message: format!("overriding {key} is not permitted for security"),
                    });
                }
            }
        }

        // Eval: threshold must be in [0, 1].
        if !(0.0..=1.0).contains(&self.eval.pattern_match_threshold) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "eval.pattern_match_threshold".into(),
                message: "pattern_match_threshold must be between 0.0 and 1.0".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                port: 8080,
                host: "127.0.0.1".into(),
                ..ServerConfig::default()
            },
            llm: LlmConfig {
                kind: ProviderKind::Anthropic,
                base_url: "https://api.anthropic.com".into(),
                model: "claude-sonnet".into(),
                auth: AuthConfig {
                    mode: AuthMode::ApiKey,
                    api_key_env: "ANTHROPIC_API_KEY".into(),
                },
                timeout_ms: 60_000,
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "server.port").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn server_host_empty_is_error() {
        let mut cfg = valid_config();
        cfg.server.host = String::new();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "server.host").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn llm_base_url_empty_is_error() {
        let mut cfg = valid_config();
        cfg.llm.base_url = String::new();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "llm.base_url").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn llm_base_url_invalid_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.llm.base_url = "ftp://localhost:5000".into();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.base_url").expect("expected base_url error");
        assert!(issue.message.contains("http://"));
    }

    #[test]
    fn llm_no_model_is_warning() {
        let mut cfg = valid_config();
        cfg.llm.model = String::new();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "llm.model").unwrap().severity, ConfigSeverity::Warning);
    }

    #[test]
    fn llm_api_key_mode_no_env_is_error() {
        let mut cfg = valid_config();
        cfg.llm.auth.api_key_env = String::new();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "llm.auth.api_key_env").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn llm_none_auth_mode_no_env_is_ok() {
        let mut cfg = valid_config();
        cfg.llm.auth.mode = AuthMode::None;
        cfg.llm.auth.api_key_env = String::new();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "llm.auth.api_key_env").is_none());
    }

    #[test]
    fn llm_timeout_zero_is_error() {
        let mut cfg = valid_config();
        cfg.llm.timeout_ms = 0;
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "llm.timeout_ms").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut cfg = valid_config();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "server.cors.allowed_origins").unwrap().severity,
            ConfigSeverity::Warning
        );
    }

    #[test]
    fn invalid_denied_pattern_is_error() {
        let mut cfg = valid_config();
        cfg.tools.exec_security.denied_patterns = vec![r"rm\s+".into(), r"[invalid".into()];
        let issues = cfg.validate();
        let issue = find_issue(&issues, "tools.exec_security.denied_patterns[1]")
            .expect("expected regex error for pattern[1]");
        assert!(issue.message.contains("invalid regex"));
    }

    #[test]
    fn memory_warning_threshold_zero_is_error() {
        let mut cfg = valid_config();
        cfg.memory.warning_threshold_percent = 0;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "memory.warning_threshold_percent").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn memory_enabled_empty_db_path_is_error() {
        let mut cfg = valid_config();
        cfg.memory.enabled = true;
        cfg.memory.db_path = String::new();
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "memory.db_path").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn mcp_duplicate_server_ids_is_error() {
        let mut cfg = valid_config();
        cfg.mcp.servers = vec![
            McpServerConfig {
                id: "fs".into(),
                command: "npx".into(),
                args: vec![],
                transport: McpTransportKind::Stdio,
                url: None,
                env: Default::default(),
            },
            McpServerConfig {
                id: "fs".into(),
                command: "npx".into(),
                args: vec![],
                transport: McpTransportKind::Stdio,
                url: None,
                env: Default::default(),
            },
        ];
        let issues = cfg.validate();
        let dup: Vec<_> = issues.iter().filter(|e| e.message.contains("duplicate MCP server id")).collect();
        assert_eq!(dup.len(), 1);
    }

    #[test]
    fn mcp_denied_env_override_is_error() {
        let mut cfg = valid_config();
        let mut env = std::collections::HashMap::new();
        env.insert("LD_PRELOAD".to_string(), "evil.so".to_string());
        cfg.mcp.servers = vec![McpServerConfig {
            id: "fs".into(),
            command: "npx".into(),
            args: vec![],
            transport: McpTransportKind::Stdio,
            url: None,
            env,
        }];
        let issues = cfg.validate();
        assert!(find_issue(&issues, "mcp.servers[0].env.LD_PRELOAD").is_some());
    }

    #[test]
    fn eval_threshold_out_of_range_is_error() {
        let mut cfg = valid_config();
        cfg.eval.pattern_match_threshold = 1.5;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "eval.pattern_match_threshold").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] server.port: port must be greater than 0");
    }
}
