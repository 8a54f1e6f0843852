//! Shell tool — the agent-facing wrapper around the exec/process engine.
//!
//! A single tool with an `action` discriminator: `run` spawns a command
//! (foregrounding with auto-background past `yield_ms`, per [`crate::exec`]);
//! the rest (`list`, `poll`, `log`, `write`, `kill`, `clear`, `remove`) manage
//! background sessions already started by a prior `run`, per [`crate::process`].

use std::sync::Arc;

use ah_domain::config::ExecSecurityConfig;
use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

use crate::exec::{check_denied_command, exec, ExecRequest};
use crate::manager::ProcessManager;
use crate::process::{handle_process, ProcessAction, ProcessRequest};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ShellRequest {
    Run {
        command: String,
        #[serde(default)]
        background: bool,
        yield_ms: Option<u64>,
        timeout_sec: Option<u64>,
        #[serde(default)]
        workdir: Option<String>,
        #[serde(default)]
        env: Option<std::collections::HashMap<String, String>>,
    },
    List,
    Poll {
        session_id: String,
        #[serde(default)]
        offset: Option<usize>,
    },
    Log {
        session_id: String,
        #[serde(default)]
        offset: Option<usize>,
        #[serde(default)]
        limit: Option<usize>,
        #[serde(default)]
        tail_lines: Option<usize>,
    },
    Write {
        session_id: String,
        #[serde(default)]
        data: Option<String>,
        #[serde(default)]
        eof: bool,
    },
    Kill {
        session_id: String,
    },
    Clear,
    Remove {
        session_id: String,
    },
}

pub struct ShellTool {
    manager: Arc<ProcessManager>,
    security: ExecSecurityConfig,
}

impl ShellTool {
    pub fn new(manager: Arc<ProcessManager>, security: ExecSecurityConfig) -> Self {
        Self { manager, security }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Run shell commands and manage long-running background sessions. \
                `run` executes a command, auto-backgrounding it past `yield_ms` and returning \
                a `session_id`; `list`/`poll`/`log`/`write`/`kill`/`clear`/`remove` operate on \
                sessions started by a prior `run`."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["run", "list", "poll", "log", "write", "kill", "clear", "remove"],
                    },
                    "command": {"type": "string"},
                    "background": {"type": "boolean"},
                    "yield_ms": {"type": "integer"},
                    "timeout_sec": {"type": "integer"},
                    "workdir": {"type": "string"},
                    "env": {"type": "object", "additionalProperties": {"type": "string"}},
                    "session_id": {"type": "string"},
                    "offset": {"type": "integer"},
                    "limit": {"type": "integer"},
                    "tail_lines": {"type": "integer"},
                    "data": {"type": "string"},
                    "eof": {"type": "boolean"},
                },
                "required": ["action"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: ShellRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        match req {
            ShellRequest::Run { command, background, yield_ms, timeout_sec, workdir, env } => {
                if let Some(pattern) = check_denied_command(&command, &self.security.denied_patterns) {
                    return Err(Error::ToolExecutionError {
                        tool: self.name().into(),
                        message: format!("command denied by security policy (matches `{pattern}`)"),
                    });
                }
                if self.security.audit_log {
                    tracing::info!(command = %command, "shell: run");
                }
                let resp = exec(
                    &self.manager,
                    ExecRequest { command, background, yield_ms, timeout_sec, workdir, env },
                )
                .await;
                Ok(serde_json::to_string(&resp).unwrap_or_default())
            }
            other => {
                let preq = match other {
                    ShellRequest::List => ProcessRequest {
                        action: ProcessAction::List,
                        session_id: None,
                        offset: None,
                        limit: None,
                        tail_lines: None,
                        data: None,
                        eof: false,
                    },
                    ShellRequest::Poll { session_id, offset } => ProcessRequest {
                        action: ProcessAction::Poll,
                        session_id: Some(session_id),
                        offset,
                        limit: None,
                        tail_lines: None,
                        data: None,
                        eof: false,
                    },
                    ShellRequest::Log { session_id, offset, limit, tail_lines } => ProcessRequest {
                        action: ProcessAction::Log,
                        session_id: Some(session_id),
                        offset,
                        limit,
                        tail_lines,
                        data: None,
                        eof: false,
                    },
                    ShellRequest::Write { session_id, data, eof } => ProcessRequest {
                        action: ProcessAction::Write,
                        session_id: Some(session_id),
                        offset: None,
                        limit: None,
                        tail_lines: None,
                        data,
                        eof,
                    },
                    ShellRequest::Kill { session_id } => ProcessRequest {
                        action: ProcessAction::Kill,
                        session_id: Some(session_id),
                        offset: None,
                        limit: None,
                        tail_lines: None,
                        data: None,
                        eof: false,
                    },
                    ShellRequest::Clear => ProcessRequest {
                        action: ProcessAction::Clear,
                        session_id: None,
                        offset: None,
                        limit: None,
                        tail_lines: None,
                        data: None,
                        eof: false,
                    },
                    ShellRequest::Remove { session_id } => ProcessRequest {
                        action: ProcessAction::Remove,
                        session_id: Some(session_id),
                        offset: None,
                        limit: None,
                        tail_lines: None,
                        data: None,
                        eof: false,
                    },
                    ShellRequest::Run { .. } => unreachable!(),
                };
                let resp = handle_process(&self.manager, preq).await;
                Ok(serde_json::to_string(&resp).unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ShellTool {
        ShellTool::new(
            Arc::new(ProcessManager::new(ah_domain::config::ExecConfig::default())),
            ExecSecurityConfig::default(),
        )
    }

    #[tokio::test]
    async fn run_echo_returns_finished_output() {
        let t = tool();
        let out = t.execute(serde_json::json!({"action": "run", "command": "echo hi", "yield_ms": 2000})).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["status"], "finished");
        assert_eq!(v["output"].as_str().unwrap().trim(), "hi");
    }

    #[tokio::test]
    async fn denied_command_is_rejected() {
        let t = tool();
        let err = t.execute(serde_json::json!({"action": "run", "command": "rm -rf /"})).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn list_with_no_sessions_is_empty() {
        let t = tool();
        let out = t.execute(serde_json::json!({"action": "list"})).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["data"]["count"], 0);
    }

    #[tokio::test]
    async fn background_then_poll_sees_running_session() {
        let t = tool();
        let run_out = t.execute(serde_json::json!({"action": "run", "command": "sleep 1", "background": true})).await.unwrap();
        let run: serde_json::Value = serde_json::from_str(&run_out).unwrap();
        let sid = run["session_id"].as_str().unwrap();

        let poll_out = t.execute(serde_json::json!({"action": "poll", "session_id": sid})).await.unwrap();
        let poll: serde_json::Value = serde_json::from_str(&poll_out).unwrap();
        assert!(poll["success"].as_bool().unwrap());
    }
}
