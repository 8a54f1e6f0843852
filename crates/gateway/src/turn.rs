//! Drives one chat turn through a session's agent (§4.12) and reports it as
//! an ordered [`TurnEvent`] sequence — the same shape whether the caller
//! wants a single aggregated JSON response or an SSE stream.
//!
//! Every provider adapter in `ah-providers` resolves the full model
//! response before returning (no incremental token delivery), so events
//! here are reconstructed from the finished run rather than emitted live as
//! the model generates — the `thinking`/`tool_call`/`tool_result` events
//! describe what happened, in order, not what is happening right now.

use ah_agent::{BaseAgent, ToolCallingAgent};
use ah_domain::tool::{Message, Role};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    Connected { session_id: String },
    Thinking,
    ToolCall { name: String, arguments: serde_json::Value },
    ToolResult { name: String, content: String, is_error: bool },
    Step { step: u32 },
    TokenUsage { input_tokens: u64, output_tokens: u64 },
    Message { role: String, content: String },
    Complete { run_summary: String },
    Error { message: String },
}

pub struct TurnOutput {
    pub events: Vec<TurnEvent>,
    /// The agent's final assistant-authored reply, if any step produced one.
    pub reply: Option<String>,
    pub new_messages: Vec<Message>,
}

/// Run `message` through `agent` to completion and translate the resulting
/// transcript + token counters into a `TurnEvent` sequence.
pub async fn run_turn(session_id: &str, agent: &mut BaseAgent, message: String) -> TurnOutput {
    let before = agent.memory.messages().len();
    let mut events = vec![TurnEvent::Connected { session_id: session_id.to_string() }, TurnEvent::Thinking];

    let mut executor = ToolCallingAgent::new();
    let run_result = agent.run(&mut executor, Some(message)).await;

    let new_messages: Vec<Message> = agent.memory.messages()[before..].to_vec();
    for m in &new_messages {
        match m.role {
            Role::Assistant => {
                if let Some(calls) = &m.tool_calls {
                    for call in calls {
                        events.push(TurnEvent::ToolCall { name: call.tool_name.clone(), arguments: call.arguments.clone() });
                    }
                }
                if let Some(content) = &m.content {
                    events.push(TurnEvent::Message { role: "assistant".into(), content: content.clone() });
                }
            }
            Role::Tool => events.push(TurnEvent::ToolResult {
                name: m.name.clone().unwrap_or_default(),
                content: m.content.clone().unwrap_or_default(),
                is_error: false,
            }),
            Role::User | Role::System => {}
        }
    }
    events.push(TurnEvent::Step { step: agent.current_step() });
    events.push(TurnEvent::TokenUsage { input_tokens: agent.llm.total_input_tokens(), output_tokens: agent.llm.total_completion_tokens() });

    let reply = new_messages.iter().rev().find(|m| m.role == Role::Assistant).and_then(|m| m.content.clone());

    match run_result {
        Ok(run_summary) => {
            events.push(TurnEvent::Complete { run_summary });
            TurnOutput { events, reply, new_messages }
        }
        Err(e) => {
            events.push(TurnEvent::Error { message: e.to_string() });
            TurnOutput { events, reply, new_messages }
        }
    }
}
