//! Static catalogue of the API endpoints the client talks to

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;

/// HTTP methods used by the client. Only `Post` may carry a form body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl_wire_name_conversions!(HttpMethod {
    Get => "get",
    Post => "post",
    Delete => "delete",
});

impl HttpMethod {
    pub const fn allows_body(self) -> bool {
        matches!(self, Self::Post)
    }
}

/// Which timeline to read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimelineScope {
    Home,
    Public,
    /// Public timeline restricted to the instance's own users.
    Local,
    /// Direct-message conversations.
    Messages,
    List { id: String },
    Tag { tag: String },
}

/// A named, parameterized API path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    RegisterApp,
    Authorize,
    Token,
    VerifyCredentials,
    Account { id: String },
    Timeline(TimelineScope),
    Conversations,
}

impl Endpoint {
    pub fn account(id: impl Into<String>) -> Self {
        Self::Account { id: id.into() }
    }

    /// Path segments, unencoded. Dynamic parameters occupy exactly one
    /// segment each and are percent-encoded when the URL is resolved.
    pub fn segments(&self) -> Vec<Cow<'_, str>> {
        fn fixed<'a>(parts: &[&'static str]) -> Vec<Cow<'a, str>> {
            parts.iter().map(|p| Cow::Borrowed(*p)).collect()
        }

        match self {
            Self::RegisterApp => fixed(&["api", "v1", "apps"]),
            Self::Authorize => fixed(&["oauth", "authorize"]),
            Self::Token => fixed(&["oauth", "token"]),
            Self::VerifyCredentials => fixed(&["api", "v1", "accounts", "verify_credentials"]),
            Self::Account { id } => {
                let mut segments = fixed(&["api", "v1", "accounts"]);
                segments.push(Cow::Borrowed(id.as_str()));
                segments
            }
            Self::Timeline(scope) => match scope {
                TimelineScope::Home => fixed(&["api", "v1", "timelines", "home"]),
                TimelineScope::Public | TimelineScope::Local => {
                    fixed(&["api", "v1", "timelines", "public"])
                }
                TimelineScope::Messages => fixed(&["api", "v1", "conversations"]),
                TimelineScope::List { id } => {
                    let mut segments = fixed(&["api", "v1", "timelines", "list"]);
                    segments.push(Cow::Borrowed(id.as_str()));
                    segments
                }
                TimelineScope::Tag { tag } => {
                    let mut segments = fixed(&["api", "v1", "timelines", "tag"]);
                    segments.push(Cow::Borrowed(tag.as_str()));
                    segments
                }
            },
            Self::Conversations => fixed(&["api", "v1", "conversations"]),
        }
    }

    /// Query parameters that are part of the endpoint identity.
    pub const fn fixed_query(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Timeline(TimelineScope::Local) => &[("local", "true")],
            _ => &[],
        }
    }

    /// Method the server expects for this endpoint.
    pub const fn default_method(&self) -> HttpMethod {
        match self {
            Self::RegisterApp | Self::Token => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    /// Whether the endpoint is part of the OAuth handshake and must never
    /// carry the session's bearer token.
    pub const fn is_oauth(&self) -> bool {
        matches!(self, Self::RegisterApp | Self::Authorize | Self::Token)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
