use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: d_base_url(),
            model: String::new(),
            auth: AuthConfig::default(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

fn d_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn d_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenaiCompat,
}

/// How the API key is attached to outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    QueryParam,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Name of the environment variable holding the API key. Never read the
    /// key itself into config values — only the variable name is stored.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            api_key_env: d_api_key_env(),
        }
    }
}

fn d_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
