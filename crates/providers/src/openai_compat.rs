//! OpenAI-compatible adapter.
//!
//! Works with OpenAI itself, Ollama, vLLM, LM Studio, Together, and any other
//! endpoint that follows the OpenAI chat completions contract.

use ah_domain::config::LlmConfig;
use ah_domain::error::{Error, Result};
use ah_domain::tool::{Message, Role, ToolCall, ToolDefinition};
use serde_json::Value;

use crate::traits::{estimate_message_tokens, Llm, ToolAskResponse, ToolChoice, TokenCounters};
use crate::util::{from_reqwest, resolve_api_key};

const DEFAULT_MODEL: &str = "gpt-4o";

/// An `Llm` adapter for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatLlm {
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
    counters: TokenCounters,
}

impl OpenAiCompatLlm {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let default_model = if cfg.model.is_empty() { DEFAULT_MODEL.to_string() } else { cfg.model.clone() };
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
        let mut builder = self.client.post(url).header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        builder
    }

    fn build_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        system_messages: Option<&[String]>,
        model: Option<&str>,
        tool_choice: Option<ToolChoice>,
    ) -> Value {
        let mut wire_messages: Vec<Value> = Vec::with_capacity(messages.len() + 1);
        for text in system_messages.unwrap_or(&[]) {
            wire_messages.push(serde_json::json!({"role": "system", "content": text}));
        }
        wire_messages.extend(messages.iter().map(msg_to_openai));

        let mut body = serde_json::json!({
            "model": model.unwrap_or(&self.default_model),
            "messages": wire_messages,
        });

        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(wire_tools);
            if let Some(choice) = tool_choice {
                body["tool_choice"] = match choice {
                    ToolChoice::Auto => Value::String("auto".into()),
                    ToolChoice::Required => Value::String("required".into()),
                    ToolChoice::None => Value::String("none".into()),
                };
            }
        }

        body
    }

    async fn complete(&self, body: Value) -> Result<(String, Vec<ToolCall>, Option<(u64, u64)>)> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, "openai-compat request");

        let resp = self.authed_post(&url).json(&body).send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::ModelError {
                provider: "openai-compat".into(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_openai_response(&resp_json)
    }
}

#[async_trait::async_trait]
impl Llm for OpenAiCompatLlm {
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

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
            "content": msg.content.clone().unwrap_or_default(),
        }),
        Role::Assistant => assistant_to_openai(msg),
        _ => serde_json::json!({
            "role": role_to_str(msg.role),
            "content": msg.content.clone().unwrap_or_default(),
        }),
    }
}

fn assistant_to_openai(msg: &Message) -> Value {
    let mut obj = serde_json::json!({"role": "assistant"});
    obj["content"] = match &msg.content {
        Some(t) if !t.is_empty() => Value::String(t.clone()),
        _ => Value::Null,
    };
    if let Some(calls) = &msg.tool_calls {
        let wire_calls: Vec<Value> = calls
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.call_id,
                    "type": "function",
                    "function": {"name": c.tool_name, "arguments": c.arguments.to_string()},
                })
            })
            .collect();
        obj["tool_calls"] = Value::Array(wire_calls);
    }
    obj
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        },
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_openai_response(body: &Value) -> Result<(String, Vec<ToolCall>, Option<(u64, u64)>)> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| Error::ModelError { provider: "openai-compat".into(), message: "response has no choices".into() })?;

    let message = choice.get("message").cloned().unwrap_or(Value::Null);
    let text = message.get("content").and_then(|v| v.as_str()).unwrap_or("").to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| {
            let call_id = tc.get("id")?.as_str()?.to_string();
            let func = tc.get("function")?;
            let tool_name = func.get("name")?.as_str()?.to_string();
            let args_str = func.get("arguments")?.as_str().unwrap_or("{}");
            let arguments: Value = serde_json::from_str(args_str).unwrap_or(Value::Object(Default::default()));
            Some(ToolCall { call_id, tool_name, arguments })
        })
        .collect();

    let usage = body.get("usage").and_then(|u| {
        let input = u.get("prompt_tokens")?.as_u64()?;
        let output = u.get("completion_tokens")?.as_u64()?;
        Some((input, output))
    });

    Ok((text, tool_calls, usage))
}
