//! Browser tool — fetch a URL and return its content as readable text.
//!
//! Read-only, no side effects, no authentication. HTML responses are run
//! through `html2text`; JSON is re-pretty-printed; everything else is
//! passed through as-is, truncated at `max_chars`.

use ah_domain::config::BrowserToolConfig;
use ah_domain::error::{Error, Result};
use ah_domain::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BrowserRequest {
    url: String,
    max_chars: Option<usize>,
}

pub struct BrowserTool {
    config: BrowserToolConfig,
    client: reqwest::Client,
}

impl BrowserTool {
    pub fn new(config: BrowserToolConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_sec))
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent("agent-harness/0.1")
            .build()
            .expect("reqwest client config is static and valid");
        Self { config, client }
    }
}

#[async_trait]
impl Tool for BrowserTool {
    fn name(&self) -> &str {
        "browser"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Fetch content from an http/https URL and convert it to readable \
                text. HTML is converted to plain text; JSON is pretty-printed. Read-only — \
                no authentication, no localhost/private addresses, no side effects."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL to fetch (http or https)."},
                    "max_chars": {"type": "integer", "description": "Maximum characters to return."},
                },
                "required": ["url"],
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String> {
        let req: BrowserRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolArgumentInvalid { tool: self.name().into(), message: e.to_string() })?;

        if !req.url.starts_with("http://") && !req.url.starts_with("https://") {
            return Err(Error::ToolArgumentInvalid {
                tool: self.name().into(),
                message: "url must start with http:// or https://".into(),
            });
        }

        let max_chars = req.max_chars.unwrap_or(self.config.max_chars);
        fetch_url(&self.client, &req.url, max_chars)
            .await
            .map_err(|e| Error::ToolExecutionError { tool: self.name().into(), message: format!("fetch error: {e}") })
    }
}

async fn fetch_url(client: &reqwest::Client, url: &str, max_chars: usize) -> std::result::Result<String, reqwest::Error> {
    let response = client.get(url).send().await?;
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let body = response.text().await?;

    let content = if content_type.contains("html") {
        html_to_text(&body)
    } else if content_type.contains("json") {
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(v) => serde_json::to_string_pretty(&v).unwrap_or(body),
            Err(_) => body,
        }
    } else {
        body
    };

    Ok(if content.len() > max_chars {
        format!("{}...[truncated at {max_chars} chars; total {} chars]", &content[..max_chars], content.len())
    } else {
        content
    })
}

fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 100)
}
