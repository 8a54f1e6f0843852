//! Tool-calling agent: `step()` as `think()` then `act()` (§4.2).
//!
//! `think` asks the model with the live tool schema set attached; `act`
//! resolves and executes whatever tool calls the model requested, appending
//! one tool-role message per call. Composed with [`BaseAgent`] rather than
//! subclassing it — this struct holds no state of its own beyond what
//! distinguishes it from other `StepExecutor`s.

use ah_domain::error::Result;
use ah_domain::tool::{Message, Role, ToolCall};
use ah_providers::ToolChoice;
use async_trait::async_trait;

use crate::base::{BaseAgent, StepExecutor};

pub struct ToolCallingAgent;

impl ToolCallingAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToolCallingAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for ToolCallingAgent {
    async fn step(&mut self, base: &mut BaseAgent) -> Result<String> {
        let requested_tools = think(base).await?;
        if requested_tools {
            act(base).await
        } else {
            Ok("no tool call requested; nothing to act on".to_string())
        }
    }
}

/// Build the request from system prompt + memory + live tool schemas, ask
/// the model, and append its reply. Returns whether it requested a tool call.
async fn think(base: &mut BaseAgent) -> Result<bool> {
    let schemas = base.tools.definitions();
    let system_messages: Vec<String> = {
        let mut v = Vec::new();
        if let Some(sp) = &base.system_prompt {
            v.push(sp.clone());
        }
        if let Some(nsp) = base.next_step_prompt() {
            v.push(nsp);
        }
        v
    };

    let response = base
        .llm
        .ask_with_tools(base.memory.messages(), &schemas, Some(&system_messages), ToolChoice::Auto)
        .await?;

    let requested = response.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty());
    base.memory.push(response.assistant_message);
    Ok(requested)
}

/// Execute every tool call in the last assistant message, in order, and
/// append a tool-role reply for each.
async fn act(base: &mut BaseAgent) -> Result<String> {
    let tool_calls: Vec<ToolCall> = base
        .memory
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .and_then(|m| m.tool_calls.clone())
        .unwrap_or_default();

    let mut outputs = Vec::with_capacity(tool_calls.len());
    let special_tools = base.special_tools.clone();
    let mut triggered_finish = false;

    for call in &tool_calls {
        let output = match base.tools.get(&call.tool_name) {
            None => format!("{{\"error\": \"tool not found: {}\"}}", call.tool_name),
            Some(tool) => {
                if !call.arguments.is_object() && !call.arguments.is_null() {
                    format!("{{\"error\": \"invalid arguments for tool {}: expected a JSON object\"}}", call.tool_name)
                } else {
                    let args = if call.arguments.is_null() { serde_json::json!({}) } else { call.arguments.clone() };
                    match tool.execute(args).await {
                        Ok(text) => truncate_observation(&text, base.max_observe_chars),
                        Err(e) => format!("{{\"error\": \"{}\"}}", e.to_string().replace('"', "'")),
                    }
                }
            }
        };

        if special_tools.iter().any(|t| t == &call.tool_name) {
            triggered_finish = true;
        }

        let msg = Message::tool_result(&ah_domain::tool::ToolResult::ok(&call.call_id, &output), call.tool_name.clone());
        outputs.push(output);
        base.memory.push(msg);
    }

    if triggered_finish {
        base.finish();
    }

    Ok(outputs.join("\n"))
}

fn truncate_observation(text: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(limit) if text.chars().count() > limit => text.chars().take(limit).collect(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_domain::config::AgentConfig;
    use ah_domain::error::Result as DomainResult;
    use ah_domain::tool::{Message as Msg, ToolDefinition};
    use ah_providers::{Llm, ToolAskResponse};
    use ah_tools::{terminate::TerminateTool, ToolRegistry};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use crate::working_memory::WorkingMemory;

    struct ScriptedLlm {
        responses: Mutex<Vec<ToolAskResponse>>,
    }

    #[async_trait]
    impl Llm for ScriptedLlm {
        async fn ask(&self, _: &[Msg], _: Option<&[String]>, _: bool, _: Option<&str>) -> DomainResult<String> {
            Ok("n/a".into())
        }
        async fn ask_with_tools(
            &self,
            _: &[Msg],
            _: &[ToolDefinition],
            _: Option<&[String]>,
            _: ah_providers::ToolChoice,
        ) -> DomainResult<ToolAskResponse> {
            Ok(self.responses.lock().unwrap().remove(0))
        }
        fn count_message_tokens(&self, _: &[Msg]) -> usize {
            0
        }
        fn total_input_tokens(&self) -> u64 {
            0
        }
        fn total_completion_tokens(&self) -> u64 {
            0
        }
    }

    fn base_with_responses(responses: Vec<ToolAskResponse>) -> BaseAgent {
        let registry = Arc::new(ToolRegistry::new());
        registry.add(Arc::new(TerminateTool), "local");
        let llm = Arc::new(ScriptedLlm { responses: Mutex::new(responses) });
        BaseAgent::new("tool-caller", llm, registry, WorkingMemory::plain(), &AgentConfig::default(), 10)
    }

    #[tokio::test]
    async fn step_with_no_tool_call_returns_placeholder() {
        let mut base = base_with_responses(vec![ToolAskResponse {
            assistant_message: Msg::assistant("just chatting"),
            tool_calls: None,
        }]);
        let mut agent = ToolCallingAgent::new();
        let out = agent.step(&mut base).await.unwrap();
        assert_eq!(out, "no tool call requested; nothing to act on");
    }

    #[tokio::test]
    async fn unknown_tool_name_surfaces_as_error_without_failing_step() {
        let calls = vec![ToolCall { call_id: "c1".into(), tool_name: "ghost_tool".into(), arguments: serde_json::json!({}) }];
        let mut base = base_with_responses(vec![ToolAskResponse {
            assistant_message: Msg::assistant_tool_calls(calls.clone()),
            tool_calls: Some(calls),
        }]);
        let mut agent = ToolCallingAgent::new();
        let out = agent.step(&mut base).await.unwrap();
        assert!(out.contains("tool not found"));
        let last_tool_msg = base.memory.messages().last().unwrap();
        assert_eq!(last_tool_msg.role, Role::Tool);
    }

    #[tokio::test]
    async fn terminate_tool_call_transitions_agent_to_finished() {
        let calls = vec![ToolCall { call_id: "c1".into(), tool_name: "terminate".into(), arguments: serde_json::json!({"status": "success"}) }];
        let mut base = base_with_responses(vec![ToolAskResponse {
            assistant_message: Msg::assistant_tool_calls(calls),
            tool_calls: Some(vec![ToolCall { call_id: "c1".into(), tool_name: "terminate".into(), arguments: serde_json::json!({"status": "success"}) }]),
        }]);
        let mut agent = ToolCallingAgent::new();
        agent.step(&mut base).await.unwrap();
        assert_eq!(base.state(), crate::state::State::Finished);
    }
}
