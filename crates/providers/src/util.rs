//! Shared utility functions for provider adapters.

use ah_domain::config::{AuthConfig, AuthMode};
use ah_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key for a provider from its [`AuthConfig`].
///
/// `mode == AuthMode::None` needs no key and resolves to an empty string;
/// otherwise the named environment variable must be set.
pub(crate) fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if auth.mode == AuthMode::None {
        return Ok(String::new());
    }
    std::env::var(&auth.api_key_env).map_err(|_| {
        Error::Auth(format!(
            "environment variable '{}' not set or not valid UTF-8",
            auth.api_key_env
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_reads_named_env_var() {
        let var_name = "AH_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let auth = AuthConfig {
            mode: AuthMode::ApiKey,
            api_key_env: var_name.into(),
        };
        let result = resolve_api_key(&auth).unwrap();
        assert_eq!(result, "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_missing_env_var_errors() {
        let auth = AuthConfig {
            mode: AuthMode::ApiKey,
            api_key_env: "AH_TEST_NONEXISTENT_VAR_8888".into(),
        };
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("AH_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn resolve_api_key_none_mode_is_empty() {
        let auth = AuthConfig { mode: AuthMode::None, api_key_env: "IGNORED".into() };
        assert_eq!(resolve_api_key(&auth).unwrap(), "");
    }
}
