//! Client configuration and credential resolution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "IFPA_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.ifpapinball.com";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Explicit key. Falls back to `IFPA_API_KEY` when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Expiry is a transport failure and is not retried.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
    /// Run pre-flight validation before each request.
    #[serde(default = "default_validate_requests")]
    pub validate_requests: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_idle_connections() -> usize {
    8
}

fn default_validate_requests() -> bool {
    true
}

fn default_user_agent() -> String {
    concat!("ifpa-core/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout: default_timeout(),
            max_body_bytes: default_max_body_bytes(),
            max_idle_connections: default_max_idle_connections(),
            validate_requests: default_validate_requests(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_requests = enabled;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Resolve the API key from the explicit value or the environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        resolve_api_key_with(self.api_key.as_deref(), |name| std::env::var(name).ok())
    }

    /// Validate and normalise the base URL (trailing slashes stripped).
    pub fn normalized_base_url(&self) -> Result<String, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let has_host = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .is_some_and(|rest| !rest.is_empty());
        if has_host {
            Ok(trimmed.to_string())
        } else {
            Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
            })
        }
    }
}

/// Key resolution with an injectable environment lookup.
pub fn resolve_api_key_with(
    explicit: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    explicit
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env(API_KEY_ENV)
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
        .ok_or(ConfigError::MissingApiKey {
            env_var: API_KEY_ENV,
        })
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins_over_env() {
        let key = resolve_api_key_with(Some("explicit"), |_| Some("from-env".to_string()));
        assert_eq!(key.unwrap(), "explicit");
    }

    #[test]
    fn env_key_is_used_when_no_explicit_key() {
        let key = resolve_api_key_with(None, |name| {
            assert_eq!(name, API_KEY_ENV);
            Some(" from-env ".to_string())
        });
        assert_eq!(key.unwrap(), "from-env");
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let err = resolve_api_key_with(Some("  "), |_| Some(String::new())).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingApiKey {
                env_var: "IFPA_API_KEY"
            }
        );
    }

    #[test]
    fn base_url_is_normalised() {
        let config = ClientConfig::default().with_base_url("http://localhost:3000//");
        assert_eq!(config.normalized_base_url().unwrap(), "http://localhost:3000");
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        for bad in ["ftp://example.com", "localhost:3000", "https://", ""] {
            let config = ClientConfig::default().with_base_url(bad);
            assert!(
                matches!(
                    config.normalized_base_url(),
                    Err(ConfigError::InvalidBaseUrl { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_key":"k","timeout":2.5,"validate_requests":false}"#)
                .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert!(!config.validate_requests);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let result: Result<ClientConfig, _> = serde_json::from_str(r#"{"timeout":-1}"#);
        assert!(result.is_err());
    }
}
