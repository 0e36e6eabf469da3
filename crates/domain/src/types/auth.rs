//! Session types: instance, application credentials, token and auth state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::errors::FetchError;

/// Validated `host[:port]` identifying a fediverse instance.
///
/// Input is trimmed and lowercased; schemes, paths, queries and credentials
/// are rejected so the value can be spliced into `{scheme}://{domain}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceDomain(String);

impl InstanceDomain {
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let candidate = input.trim().trim_end_matches('/').to_ascii_lowercase();
        let invalid = |reason: &str| {
            FetchError::InvalidRequest(format!("invalid instance domain '{input}': {reason}"))
        };

        if candidate.is_empty() {
            return Err(invalid("empty"));
        }
        if candidate.contains("://") || candidate.contains(['/', '?', '#', '@']) {
            return Err(invalid("expected a bare host name"));
        }

        let parsed = Url::parse(&format!("https://{candidate}"))
            .map_err(|e| invalid(&e.to_string()))?;
        let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let normalized = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{scheme}://{domain}/`
    pub fn base_url(&self, scheme: &str) -> Result<Url, FetchError> {
        Url::parse(&format!("{scheme}://{}/", self.0)).map_err(|e| {
            FetchError::InvalidRequest(format!("cannot build base URL for {}: {e}", self.0))
        })
    }
}

impl fmt::Display for InstanceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceDomain {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstanceDomain {
    type Error = FetchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstanceDomain> for String {
    fn from(value: InstanceDomain) -> Self {
        value.0
    }
}

/// Client id/secret issued by dynamic application registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ApplicationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Bearer credential for one signed-in session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Token {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), scope: None, refresh_token: None }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Authentication status driving request authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    Refreshing,
    SigninInProgress,
    Authenticated(Token),
}

impl AuthState {
    pub const fn token(&self) -> Option<&Token> {
        match self {
            Self::Authenticated(token) => Some(token),
            _ => None,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub const fn is_refreshing(&self) -> bool {
        matches!(self, Self::Refreshing)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::SignedOut => "signed_out",
            Self::Refreshing => "refreshing",
            Self::SigninInProgress => "signin_in_progress",
            Self::Authenticated(_) => "authenticated",
        }
    }

    /// Transition table of the session state machine.
    ///
    /// `SignedOut` is reachable from anywhere. A new sign-in may start from
    /// any settled state, but not while a refresh is running.
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (_, Self::SignedOut)
                | (
                    Self::SignedOut | Self::SigninInProgress | Self::Authenticated(_),
                    Self::SigninInProgress
                )
                | (Self::SigninInProgress | Self::Refreshing, Self::Authenticated(_))
                | (Self::Authenticated(_), Self::Refreshing)
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transition rejected by [`AuthState::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid auth state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}
