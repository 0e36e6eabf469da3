//! Error types used throughout the client core

use std::borrow::Cow;

use thiserror::Error;

use crate::impl_wire_name_conversions;

/// Phase of the OAuth flow an [`FetchError::Auth`] failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStage {
    /// Dynamic application registration (`POST /api/v1/apps`).
    Registration,
    /// Authorization code exchange (`POST /oauth/token`).
    Exchange,
    /// Token refresh or re-verification.
    Refresh,
    /// Session bookkeeping (state transitions, stored credentials).
    Session,
}

impl_wire_name_conversions!(AuthStage {
    Registration => "registration",
    Exchange => "exchange",
    Refresh => "refresh",
    Session => "session",
});

/// Failure of a request or of an authentication step.
///
/// Status codes and raw response bodies are preserved so the host can
/// render an informative message without re-issuing the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No usable HTTP response (connect failure, timeout, reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 4xx other than 404.
    #[error("Client error {status}: {}", lossy(.body))]
    Client { status: u16, body: Vec<u8> },

    /// HTTP 5xx.
    #[error("Server error {status}: {}", lossy(.body))]
    Server { status: u16, body: Vec<u8> },

    /// Any status outside the informational ranges above.
    #[error("Unexpected status {status}: {}", lossy(.body))]
    Unknown { status: u16, body: Vec<u8> },

    /// A success payload that could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Registration, exchange, refresh or session failure.
    #[error("Authentication error during {stage}: {message}")]
    Auth {
        stage: AuthStage,
        message: String,
        #[source]
        cause: Option<Box<FetchError>>,
    },

    /// Redirect URL that cannot be handled as an OAuth callback.
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    /// The caller broke the request contract (body on GET, bad domain, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The secure credential store failed.
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type alias for client operations
pub type FetchOutcome<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Message used for every 404.
    pub const NOT_FOUND_MESSAGE: &'static str = "Resource not found";

    pub fn not_found() -> Self {
        Self::NotFound(Self::NOT_FOUND_MESSAGE.to_string())
    }

    /// Authentication failure without an underlying request error.
    pub fn auth(stage: AuthStage, message: impl Into<String>) -> Self {
        Self::Auth { stage, message: message.into(), cause: None }
    }

    /// Authentication failure caused by another error.
    pub fn auth_caused_by(stage: AuthStage, message: impl Into<String>, cause: Self) -> Self {
        Self::Auth { stage, message: message.into(), cause: Some(Box::new(cause)) }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Client { status, .. } | Self::Server { status, .. } | Self::Unknown { status, .. } => {
                Some(*status)
            }
            Self::Auth { cause: Some(cause), .. } => cause.status(),
            _ => None,
        }
    }

    /// Raw response body carried by the error, if any.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::Client { body, .. } | Self::Server { body, .. } | Self::Unknown { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    pub const fn is_registration_error(&self) -> bool {
        matches!(self, Self::Auth { stage: AuthStage::Registration, .. })
    }

    /// True when the server rejected the credentials themselves, as opposed
    /// to the request failing in transit or on the server side.
    pub fn is_credential_rejection(&self) -> bool {
        match self {
            Self::Client { status, .. } => matches!(status, 400 | 401 | 403),
            Self::Auth { cause: Some(cause), .. } => cause.is_credential_rejection(),
            Self::Auth { cause: None, .. } => true,
            _ => false,
        }
    }
}

fn lossy(body: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(body)
}
