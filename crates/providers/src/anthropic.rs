//! Anthropic-native adapter.
//!
//! Implements the Anthropic Messages API including tool use, with the
//! Anthropic-specific message structure where system content goes in a
//! separate top-level `system` field.

use ah_domain::config::LlmConfig;
use ah_domain::error::{Error, Result};
use ah_domain::tool::{Message, Role, ToolCall, ToolDefinition};
use serde_json::Value;

use crate::traits::{estimate_message_tokens, Llm, ToolAskResponse, ToolChoice, TokenCounters};
use crate::util::{from_reqwest, resolve_api_key};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// An `Llm` adapter for the Anthropic Messages API.
pub struct AnthropicLlm {
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
    counters: TokenCounters,
}

impl AnthropicLlm {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let default_model = if cfg.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            cfg.model.clone()
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            client,
            counters: TokenCounters::default(),
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    fn build_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        system_messages: Option<&[String]>,
        model: Option<&str>,
        tool_choice: Option<ToolChoice>,
    ) -> Value {
        let model = model.unwrap_or(&self.default_model);

        let mut system_parts: Vec<String> = system_messages.map(<[String]>::to_vec).unwrap_or_default();
        let mut api_messages: Vec<Value> = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(text) = &msg.content {
                        system_parts.push(text.clone());
                    }
                }
                Role::User => api_messages.push(user_msg_to_anthropic(msg)),
                Role::Assistant => api_messages.push(assistant_msg_to_anthropic(msg)),
                Role::Tool => api_messages.push(tool_result_to_anthropic(msg)),
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
            "max_tokens": DEFAULT_MAX_TOKENS,
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }

        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools.iter().map(tool_to_anthropic).collect();
            body["tools"] = Value::Array(wire_tools);
            if let Some(choice) = tool_choice {
                body["tool_choice"] = match choice {
                    ToolChoice::Auto => serde_json::json!({"type": "auto"}),
                    ToolChoice::Required => serde_json::json!({"type": "any"}),
                    ToolChoice::None => Value::Null,
                };
            }
        }

        body
    }

    async fn complete(&self, body: Value) -> Result<(String, Vec<ToolCall>, Option<(u64, u64)>)> {
        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!(url = %url, "anthropic request");

        let resp = self.authed_post(&url).json(&body).send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::ModelError {
                provider: "anthropic".into(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_anthropic_response(&resp_json)
    }
}

#[async_trait::async_trait]
impl Llm for AnthropicLlm {
    async fn ask(
        &self,
        messages: &[Message],
        system_messages: Option<&[String]>,
        _stream: bool,
        model: Option<&str>,
    ) -> Result<String> {
        let body = self.build_body(messages, &[], system_messages, model, None);
        let (text, _calls, usage) = self.complete(body).await?;
        if let Some((input, completion)) = usage {
            self.counters.record(input, completion);
        }
        Ok(text)
    }

    async fn ask_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        system_messages: Option<&[String]>,
        tool_choice: ToolChoice,
    ) -> Result<ToolAskResponse> {
        let body = self.build_body(messages, tools, system_messages, None, Some(tool_choice));
        let (text, calls, usage) = self.complete(body).await?;
        if let Some((input, completion)) = usage {
            self.counters.record(input, completion);
        }

        let assistant_message = if calls.is_empty() {
            Message::assistant(text)
        } else {
            Message::assistant_tool_calls(calls.clone())
        };

        Ok(ToolAskResponse {
            assistant_message,
            tool_calls: if calls.is_empty() { None } else { Some(calls) },
        })
    }

    fn count_message_tokens(&self, messages: &[Message]) -> usize {
        estimate_message_tokens(messages)
    }

    fn total_input_tokens(&self) -> u64 {
        self.counters.input_total()
    }

    fn total_completion_tokens(&self) -> u64 {
        self.counters.completion_total()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn user_msg_to_anthropic(msg: &Message) -> Value {
    if let Some(image) = &msg.base64_image {
        let mut content = vec![serde_json::json!({
            "type": "image",
            "source": { "type": "base64", "media_type": "image/png", "data": image },
        })];
        if let Some(text) = &msg.content {
            content.push(serde_json::json!({"type": "text", "text": text}));
        }
        return serde_json::json!({"role": "user", "content": content});
    }
    serde_json::json!({
        "role": "user",
        "content": msg.content.clone().unwrap_or_default(),
    })
}

fn assistant_msg_to_anthropic(msg: &Message) -> Value {
    let mut content: Vec<Value> = Vec::new();
    if let Some(text) = &msg.content {
        if !text.is_empty() {
            content.push(serde_json::json!({"type": "text", "text": text}));
        }
    }
    if let Some(calls) = &msg.tool_calls {
        for call in calls {
            content.push(serde_json::json!({
                "type": "tool_use",
                "id": call.call_id,
                "name": call.tool_name,
                "input": call.arguments,
            }));
        }
    }
    serde_json::json!({"role": "assistant", "content": content})
}

fn tool_result_to_anthropic(msg: &Message) -> Value {
    let tool_use_id = msg.tool_call_id.clone().unwrap_or_default();
    serde_json::json!({
        "role": "user",
        "content": [{
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": msg.content.clone().unwrap_or_default(),
        }],
    })
}

fn tool_to_anthropic(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_anthropic_response(body: &Value) -> Result<(String, Vec<ToolCall>, Option<(u64, u64)>)> {
    let content_arr = body.get("content").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut text_parts: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for block in &content_arr {
        match block.get("type").and_then(|v| v.as_str()).unwrap_or("") {
            "text" => {
                if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                    text_parts.push(t.to_string());
                }
            }
            "tool_use" => {
                let call_id = block.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let tool_name = block.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let arguments = block.get("input").cloned().unwrap_or(Value::Object(Default::default()));
                tool_calls.push(ToolCall { call_id, tool_name, arguments });
            }
            _ => {}
        }
    }

    let usage = body.get("usage").and_then(parse_anthropic_usage);

    Ok((text_parts.join(""), tool_calls, usage))
}

fn parse_anthropic_usage(v: &Value) -> Option<(u64, u64)> {
    let input = v.get("input_tokens")?.as_u64()?;
    let output = v.get("output_tokens")?.as_u64()?;
    Some((input, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_with_image_puts_image_block_first() {
        let msg = Message::user("describe this").with_image("aGVsbG8=");
        let wire = user_msg_to_anthropic(&msg);
        let content = wire["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[1]["type"], "text");
    }

    #[test]
    fn assistant_message_with_tool_calls_has_no_bare_text_block_when_empty() {
        let calls = vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "exec".into(),
            arguments: serde_json::json!({"cmd": "ls"}),
        }];
        let msg = Message::assistant_tool_calls(calls);
        let wire = assistant_msg_to_anthropic(&msg);
        let content = wire["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "tool_use");
    }

    #[test]
    fn tool_result_carries_tool_use_id() {
        let msg = Message {
            role: Role::Tool,
            content: Some("42".into()),
            tool_calls: None,
            tool_call_id: Some("c1".into()),
            name: Some("calc".into()),
            base64_image: None,
        };
        let wire = tool_result_to_anthropic(&msg);
        assert_eq!(wire["content"][0]["tool_use_id"], "c1");
        assert_eq!(wire["content"][0]["content"], "42");
    }

    #[test]
    fn parse_response_extracts_text_and_tool_calls() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "let me check"},
                {"type": "tool_use", "id": "t1", "name": "search", "input": {"q": "rust"}},
            ],
            "usage": {"input_tokens": 12, "output_tokens": 5},
        });
        let (text, calls, usage) = parse_anthropic_response(&body).unwrap();
        assert_eq!(text, "let me check");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "search");
        assert_eq!(usage, Some((12, 5)));
    }

    #[test]
    fn parse_response_with_no_usage_is_none() {
        let body = serde_json::json!({"content": []});
        let (_, _, usage) = parse_anthropic_response(&body).unwrap();
        assert!(usage.is_none());
    }
}
