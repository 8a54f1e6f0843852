//! The LLM collaborator trait every provider adapter implements.

use std::sync::atomic::{AtomicU64, Ordering};

use ah_domain::error::Result;
use ah_domain::tool::{Message, ToolCall, ToolDefinition};
use async_trait::async_trait;

/// Controls whether the model must, may, or cannot invoke a tool on a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

/// The result of an `ask_with_tools` call: the assistant's own message
/// (which may carry tool calls) plus the tool calls themselves, unpacked for
/// convenience.
#[derive(Debug, Clone)]
pub struct ToolAskResponse {
    pub assistant_message: Message,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Trait implemented by every concrete LLM adapter (Anthropic, OpenAI-compat).
///
/// `stream` is accepted on [`Llm::ask`] for wire-format parity with the
/// providers that support it, but every adapter in this crate resolves the
/// full response before returning — there is no incremental delivery here,
/// see `DESIGN.md`.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Ask a plain question, with no tools in play. Returns the assistant's
    /// text content.
    async fn ask(
        &self,
        messages: &[Message],
        system_messages: Option<&[String]>,
        stream: bool,
        model: Option<&str>,
    ) -> Result<String>;

    /// Ask with a set of tools the model may invoke.
    async fn ask_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        system_messages: Option<&[String]>,
        tool_choice: ToolChoice,
    ) -> Result<ToolAskResponse>;

    /// Estimate the token footprint of a slice of messages, in this
    /// provider's accounting.
    fn count_message_tokens(&self, messages: &[Message]) -> usize;

    /// Cumulative prompt/input tokens billed since this adapter was built.
    fn total_input_tokens(&self) -> u64;

    /// Cumulative completion/output tokens billed since this adapter was built.
    fn total_completion_tokens(&self) -> u64;
}

/// Thread-safe running totals shared by every adapter implementation.
#[derive(Debug, Default)]
pub struct TokenCounters {
    input: AtomicU64,
    completion: AtomicU64,
}

impl TokenCounters {
    pub fn record(&self, input: u64, completion: u64) {
        self.input.fetch_add(input, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    pub fn input_total(&self) -> u64 {
        self.input.load(Ordering::Relaxed)
    }

    pub fn completion_total(&self) -> u64 {
        self.completion.load(Ordering::Relaxed)
    }
}

/// Rough token estimate: one token per four characters, plus a small
/// per-message overhead for role/formatting tokens. Mirrors the heuristic
/// `ah-context` uses for its own budget tracking, kept as an independent
/// copy here to avoid a cross-crate dependency for three lines of math.
pub fn estimate_message_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|m| {
            let mut total = m.content.as_deref().map(estimate_tokens).unwrap_or(0);
            if let Some(calls) = &m.tool_calls {
                for call in calls {
                    total += estimate_tokens(&call.tool_name);
                    total += estimate_tokens(&call.arguments.to_string());
                }
            }
            total + 4
        })
        .sum()
}

fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let counters = TokenCounters::default();
        assert_eq!(counters.input_total(), 0);
        counters.record(10, 3);
        counters.record(5, 1);
        assert_eq!(counters.input_total(), 15);
        assert_eq!(counters.completion_total(), 4);
    }

    #[test]
    fn estimate_includes_tool_call_arguments() {
        let plain = vec![Message::user("hi")];
        let with_call = vec![Message::assistant_tool_calls(vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "exec".into(),
            arguments: serde_json::json!({"cmd": "ls -la /tmp"}),
        }])];
        assert!(estimate_message_tokens(&with_call) > estimate_message_tokens(&plain));
    }
}
