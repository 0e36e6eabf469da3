//! Client constants
//!
//! Centralized location for the fixed values the client core relies on:
//! OAuth parameters, credential-store key names and configuration defaults.

// OAuth
pub const OAUTH_SCOPES: &str = "read write follow push";
pub const OAUTH_RESPONSE_TYPE: &str = "code";
pub const OAUTH_CALLBACK_HOST: &str = "oauth";
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

// Client identification
pub const DEFAULT_CLIENT_NAME: &str = "Starlight";
pub const DEFAULT_WEBSITE: &str = "https://hyperspace.marquiskurt.net";
pub const DEFAULT_USER_AGENT: &str = "Starlight:v1.0 (by Starlight Development Team)";

// Routing
pub const DEFAULT_URL_PREFIX: &str = "starlight";
pub const DEFAULT_INSTANCE: &str = "mastodon.online";
pub const DEFAULT_API_SCHEME: &str = "https";

// Timeouts (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RESOURCE_TIMEOUT_SECS: u64 = 120;

// Secure storage
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "net.marquiskurt.starlight-secrets";

/// Fixed key names in the secure credential store.
pub mod keys {
    pub const INSTANCE_DOMAIN: &str = "starlight_instance_domain";
    pub const CLIENT_ID: &str = "starlight_client_id";
    pub const CLIENT_SECRET: &str = "starlight_client_secret";
    pub const ACCESS_TOKEN: &str = "starlight_access_token";
    pub const TOKEN_SCOPE: &str = "starlight_token_scope";
    pub const REFRESH_TOKEN: &str = "starlight_refresh_token";

    /// Every key written by a session, in deletion order for sign-out.
    pub const SESSION_KEYS: [&str; 6] =
        [ACCESS_TOKEN, REFRESH_TOKEN, TOKEN_SCOPE, CLIENT_SECRET, CLIENT_ID, INSTANCE_DOMAIN];
}
