//! The `task` tool (§4.7): lets the main agent delegate to a sub-agent and
//! block until it completes. Failures surface as the tool's own text output
//! (a `status: "error"` JSON body), never as a propagated error — a failed
//! sub-agent must not kill the parent's run loop.

use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

use crate::subagent::{SubAgentRegistry, KNOWN_TYPES};

#[derive(Debug, Deserialize)]
struct TaskRequest {
    agent_type: String,
    task: String,
    context: Option<serde_json::Value>,
}

pub struct TaskTool {
    registry: SubAgentRegistry,
}

impl TaskTool {
    pub fn new(registry: SubAgentRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Spawn a specialized sub-agent to handle a complex task \
                autonomously, and wait for its result. Use for deep exploration, \
                detailed planning, long coding sessions, test runs, build checks, \
                or code review.\n\
                1. Explore the codebase for a pattern.\n\
                   Input: {\"agent_type\": \"explore\", \"task\": \"find every call site of parse_config\"}\n\
                2. Run the test suite and report results.\n\
                   Input: {\"agent_type\": \"test\", \"task\": \"run the unit tests and summarize failures\"}"
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "agent_type": {"type": "string", "enum": KNOWN_TYPES},
                    "task": {"type": "string", "description": "Detailed task description for the sub-agent."},
                    "context": {"type": "object", "description": "Optional context: files, prior results, constraints."},
                },
                "required": ["agent_type", "task"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: TaskRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        let mut sub_agent = match self.registry.spawn(&req.agent_type, &req.task, req.context.as_ref()) {
            Ok(sub_agent) => sub_agent,
            Err(e) => return Ok(error_body(&req.agent_type, &e.to_string())),
        };

        match sub_agent.run_to_completion().await {
            Ok((result, steps_taken)) => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "agent_type": req.agent_type,
                "task": req.task,
                "result": result,
                "status": "completed",
                "steps_taken": steps_taken,
            }))
            .unwrap_or_default()),
            Err(e) => Ok(error_body(&req.agent_type, &format!("{e} (task: {})", truncate(&req.task, 200)))),
        }
    }
}

fn error_body(agent_type: &str, message: &str) -> String {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "error",
        "agent_type": agent_type,
        "message": message,
    }))
    .unwrap_or_default()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subagent::SubAgentEnvironment;
    use ah_domain::config::{AgentConfig, BrowserToolConfig, ExecSecurityConfig, SubAgentConfig, TestRunnerConfig};
    use ah_domain::error::Result as DomainResult;
    use ah_domain::tool::{Message, ToolCall, ToolDefinition as TD};
    use ah_providers::{Llm, ToolAskResponse, ToolChoice};
    use ah_tools::ProcessManager;
    use std::sync::Arc;

    struct StubLlm;

    #[async_trait]
    impl Llm for StubLlm {
        async fn ask(&self, _: &[Message], _: Option<&[String]>, _: bool, _: Option<&str>) -> DomainResult<String> {
            Ok("ok".into())
        }
        async fn ask_with_tools(&self, _: &[Message], _: &[TD], _: Option<&[String]>, _: ToolChoice) -> DomainResult<ToolAskResponse> {
            let calls = vec![ToolCall { call_id: "c1".into(), tool_name: "terminate".into(), arguments: serde_json::json!({"status": "success"}) }];
            Ok(ToolAskResponse { assistant_message: Message::assistant_tool_calls(calls.clone()), tool_calls: Some(calls) })
        }
        fn count_message_tokens(&self, _: &[Message]) -> usize {
            0
        }
        fn total_input_tokens(&self) -> u64 {
            0
        }
        fn total_completion_tokens(&self) -> u64 {
            0
        }
    }

    fn tool() -> TaskTool {
        let env = SubAgentEnvironment {
            llm: Arc::new(StubLlm),
            process_manager: Arc::new(ProcessManager::new(ah_domain::config::ExecConfig::default())),
            workspace_root: std::env::temp_dir(),
            exec_security: ExecSecurityConfig::default(),
            test_runner: TestRunnerConfig::default(),
            browser: BrowserToolConfig::default(),
            agent_config: AgentConfig::default(),
            sub_agent_overrides: SubAgentConfig::default(),
        };
        TaskTool::new(SubAgentRegistry::new(env))
    }

    #[tokio::test]
    async fn unknown_agent_type_surfaces_as_error_body_not_tool_error() {
        let t = tool();
        let out = t.execute(serde_json::json!({"agent_type": "bogus", "task": "do a thing"})).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["status"], "error");
    }

    #[tokio::test]
    async fn explore_task_runs_to_completion_via_terminate() {
        let t = tool();
        let out = t.execute(serde_json::json!({"agent_type": "explore", "task": "find the bug"})).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["status"], "completed");
        assert_eq!(v["agent_type"], "explore");
    }
}
