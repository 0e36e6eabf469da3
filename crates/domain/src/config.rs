//! Client configuration structures

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_API_SCHEME, DEFAULT_CLIENT_NAME, DEFAULT_INSTANCE, DEFAULT_KEYCHAIN_SERVICE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RESOURCE_TIMEOUT_SECS, DEFAULT_URL_PREFIX,
    DEFAULT_USER_AGENT, DEFAULT_WEBSITE,
};
use crate::types::auth::InstanceDomain;

/// Configuration error raised while loading or validating [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// Settings for one client instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name sent when registering the application.
    pub client_name: String,
    /// Website sent when registering the application.
    pub website: Option<String>,
    /// Scheme the host registered for OAuth redirects (`{prefix}://oauth`).
    pub url_prefix: String,
    /// Instance used before anyone has signed in.
    pub default_instance: String,
    /// `https` in production; `http` only for local test servers.
    pub api_scheme: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub resource_timeout_secs: u64,
    /// Service name for entries in the platform keychain.
    pub keychain_service: String,
    /// Developer override: start authenticated with this token, never persisted.
    #[serde(skip_serializing)]
    pub preset_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            website: Some(DEFAULT_WEBSITE.to_string()),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            default_instance: DEFAULT_INSTANCE.to_string(),
            api_scheme: DEFAULT_API_SCHEME.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            resource_timeout_secs: DEFAULT_RESOURCE_TIMEOUT_SECS,
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            preset_token: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_name", &self.client_name)
            .field("website", &self.website)
            .field("url_prefix", &self.url_prefix)
            .field("default_instance", &self.default_instance)
            .field("api_scheme", &self.api_scheme)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("resource_timeout_secs", &self.resource_timeout_secs)
            .field("keychain_service", &self.keychain_service)
            .field("preset_token", &self.preset_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ClientConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn resource_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_timeout_secs)
    }

    /// Check invariants the rest of the client relies on.
    ///
    /// # Errors
    /// Returns [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_name.trim().is_empty() {
            return Err(ConfigError("client_name must not be empty".into()));
        }
        validate_url_prefix(&self.url_prefix)?;
        if !matches!(self.api_scheme.as_str(), "https" | "http") {
            return Err(ConfigError(format!(
                "api_scheme must be http or https, got '{}'",
                self.api_scheme
            )));
        }
        InstanceDomain::parse(&self.default_instance)
            .map_err(|e| ConfigError(format!("default_instance: {e}")))?;
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError("user_agent must not be empty".into()));
        }
        if self.request_timeout_secs == 0 || self.resource_timeout_secs == 0 {
            return Err(ConfigError("timeouts must be greater than zero".into()));
        }
        if self.request_timeout_secs > self.resource_timeout_secs {
            return Err(ConfigError(format!(
                "request timeout ({}s) exceeds resource timeout ({}s)",
                self.request_timeout_secs, self.resource_timeout_secs
            )));
        }
        if self.keychain_service.trim().is_empty() {
            return Err(ConfigError("keychain_service must not be empty".into()));
        }
        Ok(())
    }
}

/// A URL scheme per RFC 3986: a letter followed by letters, digits, `+`,
/// `-` or `.`.
///
/// # Errors
/// Returns [`ConfigError`] when `prefix` is not a valid scheme.
pub fn validate_url_prefix(prefix: &str) -> Result<(), ConfigError> {
    let mut chars = prefix.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ConfigError(format!("url_prefix '{prefix}' is not a valid URL scheme")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.resource_timeout(), Duration::from_secs(120));
        assert_eq!(config.url_prefix, "starlight");
        assert_eq!(config.default_instance, "mastodon.online");
    }

    #[test]
    fn test_rejects_bad_timeouts() {
        let config = ClientConfig { request_timeout_secs: 0, ..ClientConfig::default() };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            request_timeout_secs: 300,
            resource_timeout_secs: 120,
            ..ClientConfig::default()
        };
        assert!(config.validate().unwrap_err().0.contains("exceeds"));
    }

    #[test]
    fn test_rejects_bad_scheme_and_prefix() {
        let config = ClientConfig { api_scheme: "ftp".into(), ..ClientConfig::default() };
        assert!(config.validate().is_err());

        for prefix in ["", "1app", "my app", "app:"] {
            assert!(validate_url_prefix(prefix).is_err(), "{prefix:?} should be rejected");
        }
        for prefix in ["starlight", "com.example.app", "x-callback+v2"] {
            assert!(validate_url_prefix(prefix).is_ok(), "{prefix:?} should be accepted");
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"url_prefix": "hyperspace"}"#).unwrap();
        assert_eq!(config.url_prefix, "hyperspace");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_debug_redacts_preset_token() {
        let config = ClientConfig { preset_token: Some("dev-token".into()), ..ClientConfig::default() };
        assert!(!format!("{config:?}").contains("dev-token"));
    }
}
