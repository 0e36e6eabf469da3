//! Data-transfer models for the REST resources the client decodes
//!
//! Only the fields the client core relies on are typed; everything is
//! defaulted so partial payloads from older servers still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;
use crate::types::auth::{ApplicationCredentials, Token};
use crate::utils::serde::epoch_seconds_option;

/// Audience of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Unlisted,
    Direct,
}

impl_wire_name_conversions!(Visibility {
    Public => "public",
    Private => "private",
    Unlisted => "unlisted",
    Direct => "direct",
});

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub display_name: String,
    pub locked: bool,
    pub bot: bool,
    #[serde(with = "epoch_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    pub note: String,
    pub url: String,
    pub avatar: String,
    pub header: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub statuses_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub id: String,
    pub uri: String,
    pub url: Option<String>,
    #[serde(with = "epoch_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    pub account: Account,
    pub content: String,
    pub visibility: Visibility,
    pub sensitive: bool,
    pub spoiler_text: String,
    pub in_reply_to_id: Option<String>,
    pub reblog: Option<Box<Status>>,
    pub replies_count: u64,
    pub reblogs_count: u64,
    pub favourites_count: u64,
}

/// A direct-message thread.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversation {
    pub id: String,
    pub accounts: Vec<Account>,
    pub unread: bool,
    pub last_status: Option<Status>,
}

/// Response of `POST /api/v1/apps`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    pub client_id: String,
    pub client_secret: String,
}

impl Application {
    pub fn credentials(&self) -> ApplicationCredentials {
        ApplicationCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Response of `POST /oauth/token`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "epoch_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            scope: response.scope.filter(|s| !s.is_empty()),
            refresh_token: response.refresh_token.filter(|s| !s.is_empty()),
        }
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_account_decodes_epoch_and_partial_payload() {
        let account: Account = serde_json::from_value(json!({
            "id": "1",
            "username": "Gargron",
            "acct": "Gargron",
            "created_at": 1_458_138_866,
            "followers_count": 10
        }))
        .unwrap();

        assert_eq!(account.id, "1");
        assert_eq!(account.username, "Gargron");
        assert_eq!(account.created_at.map(|d| d.timestamp()), Some(1_458_138_866));
        assert_eq!(account.followers_count, 10);
        assert!(account.display_name.is_empty());
    }

    #[test]
    fn test_status_with_reblog_and_visibility() {
        let status: Status = serde_json::from_value(json!({
            "id": "103",
            "visibility": "unlisted",
            "account": {"id": "1", "username": "a"},
            "reblog": {"id": "100", "visibility": "direct", "account": {"id": "2"}}
        }))
        .unwrap();

        assert_eq!(status.visibility, Visibility::Unlisted);
        let reblog = status.reblog.unwrap();
        assert_eq!(reblog.id, "100");
        assert_eq!(reblog.visibility, Visibility::Direct);
    }

    #[test]
    fn test_conversation() {
        let conversation: Conversation = serde_json::from_value(json!({
            "id": "7",
            "unread": true,
            "accounts": [{"id": "3", "username": "c"}],
            "last_status": null
        }))
        .unwrap();

        assert!(conversation.unread);
        assert_eq!(conversation.accounts.len(), 1);
        assert!(conversation.last_status.is_none());
    }

    #[test]
    fn test_application_requires_credentials() {
        let app: Application = serde_json::from_value(json!({
            "id": "563419",
            "name": "Starlight",
            "client_id": "cid",
            "client_secret": "csecret"
        }))
        .unwrap();
        assert_eq!(app.credentials().client_id, "cid");
        assert!(!format!("{app:?}").contains("csecret"));

        assert!(serde_json::from_value::<Application>(json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_token_response_into_token() {
        let response: TokenResponse = serde_json::from_value(json!({
            "access_token": "abc",
            "token_type": "Bearer",
            "scope": "read write follow push",
            "created_at": 1_573_979_017
        }))
        .unwrap();

        let token = Token::from(response);
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.scope.as_deref(), Some("read write follow push"));
        assert_eq!(token.refresh_token, None);
    }
}
