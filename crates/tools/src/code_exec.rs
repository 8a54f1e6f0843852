//! Code-exec tool — run a short code snippet to completion in a chosen
//! interpreter, distinct from `shell`'s free-form/backgroundable commands.
//!
//! The snippet is written to a temp file and handed to the interpreter's
//! command line (`python3 <file>`, `node <file>`, ...) so multi-line code
//! with embedded quoting never has to survive a `sh -c` round-trip.

use std::sync::Arc;

use ah_domain::config::ExecSecurityConfig;
use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

use crate::exec::{exec, ExecRequest};
use crate::manager::{ProcessManager, ProcessStatus};

#[derive(Debug, Deserialize)]
struct CodeExecRequest {
    code: String,
    #[serde(default = "default_language")]
    language: Language,
    #[serde(default)]
    timeout_sec: Option<u64>,
}

fn default_language() -> Language {
    Language::Python
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Language {
    Python,
    Javascript,
    Bash,
}

impl Language {
    fn extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Javascript => "js",
            Language::Bash => "sh",
        }
    }

    fn interpreter(&self) -> &'static str {
        match self {
            Language::Python => "python3",
            Language::Javascript => "node",
            Language::Bash => "bash",
        }
    }
}

pub struct CodeExecTool {
    manager: Arc<ProcessManager>,
    security: ExecSecurityConfig,
}

impl CodeExecTool {
    pub fn new(manager: Arc<ProcessManager>, security: ExecSecurityConfig) -> Self {
        Self { manager, security }
    }
}

#[async_trait]
impl Tool for CodeExecTool {
    fn name(&self) -> &str {
        "code_exec"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Execute a short code snippet to completion and return its \
                stdout/stderr. Only printed output is visible; use print/console.log \
                statements to surface results. Supports python, javascript, and bash."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string", "description": "The code to execute."},
                    "language": {"type": "string", "enum": ["python", "javascript", "bash"], "default": "python"},
                    "timeout_sec": {"type": "integer", "description": "Default 30."},
                },
                "required": ["code"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: CodeExecRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        if self.security.audit_log {
            tracing::info!(language = ?req.language, "code_exec: run");
        }

        let file_name = format!("{}.{}", uuid::Uuid::new_v4().as_simple(), req.language.extension());
        let path = std::env::temp_dir().join(file_name);
        tokio::fs::write(&path, &req.code)
            .await
            .map_err(|e| Error::ToolExecutionError { tool: self.name().into(), message: format!("failed to stage snippet: {e}") })?;

        let command = format!("{} {}", req.language.interpreter(), path.display());
        let resp = exec(
            &self.manager,
            ExecRequest {
                command,
                background: false,
                yield_ms: req.timeout_sec.map(|s| s * 1000),
                timeout_sec: req.timeout_sec.or(Some(30)),
                workdir: None,
                env: None,
            },
        )
        .await;

        let _ = tokio::fs::remove_file(&path).await;

        let success = matches!(resp.status, ProcessStatus::Finished) && resp.exit_code == Some(0);
        Ok(serde_json::json!({
            "success": success,
            "output": resp.output.unwrap_or_default(),
            "exit_code": resp.exit_code,
            "status": resp.status,
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> CodeExecTool {
        CodeExecTool::new(
            Arc::new(ProcessManager::new(ah_domain::config::ExecConfig::default())),
            ExecSecurityConfig::default(),
        )
    }

    #[tokio::test]
    async fn runs_python_snippet() {
        let out = tool()
            .execute(serde_json::json!({"code": "print(1 + 1)", "language": "python"}))
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["output"].as_str().unwrap().trim(), "2");
        assert!(v["success"].as_bool().unwrap());
    }

    #[tokio::test]
    async fn runs_bash_snippet_by_default_language_override() {
        let out = tool()
            .execute(serde_json::json!({"code": "echo hi", "language": "bash"}))
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["output"].as_str().unwrap().trim(), "hi");
    }
}
