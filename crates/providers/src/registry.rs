//! Builds the single configured [`Llm`] instance from [`LlmConfig`].

use std::sync::Arc;

use ah_domain::config::{LlmConfig, ProviderKind};
use ah_domain::error::Result;

use crate::anthropic::AnthropicLlm;
use crate::openai_compat::OpenAiCompatLlm;
use crate::traits::Llm;

/// Construct the configured `Llm` adapter.
///
/// API key resolution happens eagerly here (the named environment variable
/// is read once, at startup) so a missing key surfaces as a config error
/// before the agent loop ever makes a request.
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn Llm>> {
    let llm: Arc<dyn Llm> = match config.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicLlm::from_config(config)?),
        ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatLlm::from_config(config)?),
    };
    Ok(llm)
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message, so raw secrets never leak into logs or status endpoints.
pub fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20 && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_domain::config::{AuthConfig, AuthMode};

    #[test]
    fn build_llm_anthropic_requires_key_env() {
        let cfg = LlmConfig {
            kind: ProviderKind::Anthropic,
            auth: AuthConfig { mode: AuthMode::ApiKey, api_key_env: "AH_TEST_REGISTRY_MISSING".into() },
            ..LlmConfig::default()
        };
        assert!(build_llm(&cfg).is_err());
    }

    #[test]
    fn build_llm_none_mode_succeeds_without_key() {
        let cfg = LlmConfig {
            kind: ProviderKind::OpenaiCompat,
            base_url: "http://localhost:11434/v1".into(),
            auth: AuthConfig { mode: AuthMode::None, api_key_env: "IGNORED".into() },
            ..LlmConfig::default()
        };
        assert!(build_llm(&cfg).is_ok());
    }

    #[test]
    fn mask_secrets_redacts_long_tokens() {
        let msg = "auth failed for key sk-ant-REDACTED";
        let masked = mask_secrets(msg);
        assert!(!masked.contains("1234567890abcdef1234567890"));
        assert!(masked.contains("..."));
    }

    #[test]
    fn mask_secrets_leaves_short_words_alone() {
        let msg = "bad request: model not found";
        assert_eq!(mask_secrets(msg), msg);
    }
}
