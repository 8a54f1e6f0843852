use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool call emitted by the model (provider-agnostic — every provider
/// adapter converts its own tool-call wire format to/from this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Tool definition exposed to the model as part of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Outcome of executing a `ToolCall`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: content.into(), is_error: false }
    }

    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: content.into(), is_error: true }
    }
}

/// A message in the conversation, in a flat OpenAI-style shape: any given
/// message carries plain text, a set of tool calls, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Set on `Role::Tool` messages — the `call_id` this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this message, when `role == Tool`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base64-encoded image attached to the message, for vision-capable models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            base64_image: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            base64_image: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            base64_image: None,
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            name: None,
            base64_image: None,
        }
    }

    pub fn tool_result(result: &ToolResult, tool_name: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.content.clone()),
            tool_calls: None,
            tool_call_id: Some(result.call_id.clone()),
            name: Some(tool_name.into()),
            base64_image: None,
        }
    }

    pub fn with_image(mut self, base64: impl Into<String>) -> Self {
        self.base64_image = Some(base64.into());
        self
    }
}

/// A tool the agent loop can invoke. Implementors describe their schema via
/// `definition()` and perform the side effect in `execute()`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, arguments: serde_json::Value) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_no_tool_calls() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.as_deref(), Some("hello"));
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn assistant_tool_calls_has_no_content() {
        let calls = vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "exec".into(),
            arguments: serde_json::json!({"cmd": "ls"}),
        }];
        let msg = Message::assistant_tool_calls(calls);
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls.unwrap().len(), 1);
    }

    #[test]
    fn tool_result_message_carries_call_id_and_name() {
        let result = ToolResult::ok("c1", "done");
        let msg = Message::tool_result(&result, "exec");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.name.as_deref(), Some("exec"));
        assert_eq!(msg.content.as_deref(), Some("done"));
    }

    #[test]
    fn with_image_sets_base64_field() {
        let msg = Message::user("describe this").with_image("aGVsbG8=");
        assert_eq!(msg.base64_image.as_deref(), Some("aGVsbG8="));
    }
}
