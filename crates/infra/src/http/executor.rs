//! Authenticated request execution against the active instance
//!
//! The executor owns the base URL of the instance the session talks to and
//! reads the shared auth state at send time: `Authenticated` attaches the
//! bearer token, `Refreshing` waits for the refresh to settle, anything
//! else goes out anonymously. Responses are classified by status first and
//! only 2xx payloads reach the JSON decoder.

use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use starlight_common::AuthStateHolder;
use starlight_domain::{
    AuthState, ClientConfig, Endpoint, FetchError, FetchOutcome, HttpMethod, InstanceDomain, Token,
};
use tracing::{debug, instrument, warn};
use url::Url;

use super::classifier::classify;
use super::client::HttpClient;
use super::request::{RequestDescriptor, RequestParams};
use crate::errors::IntoFetchError;

/// How a request is authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Use the session's token if there is one.
    Session,
    /// Never attach a token (OAuth handshake calls).
    Anonymous,
    /// Use this specific token regardless of the session state.
    Bearer(Token),
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session => f.write_str("Session"),
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

pub struct RequestExecutor {
    http: HttpClient,
    state: AuthStateHolder,
    scheme: String,
    base_url: RwLock<Url>,
    settle_timeout: Duration,
}

impl RequestExecutor {
    pub fn new(
        config: &ClientConfig,
        state: AuthStateHolder,
        instance: &InstanceDomain,
    ) -> Result<Self, FetchError> {
        let http = HttpClient::from_config(config)?;
        Self::with_client(http, state, &config.api_scheme, instance, config.request_timeout())
    }

    pub fn with_client(
        http: HttpClient,
        state: AuthStateHolder,
        scheme: &str,
        instance: &InstanceDomain,
        settle_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_url = instance.base_url(scheme)?;
        Ok(Self {
            http,
            state,
            scheme: scheme.to_string(),
            base_url: RwLock::new(base_url),
            settle_timeout,
        })
    }

    pub fn base_url(&self) -> Url {
        self.base_url.read().clone()
    }

    /// Base URL for an arbitrary instance using this executor's scheme.
    pub fn base_url_for(&self, instance: &InstanceDomain) -> Result<Url, FetchError> {
        instance.base_url(&self.scheme)
    }

    /// Point subsequent session requests at `instance`.
    pub fn set_instance(&self, instance: &InstanceDomain) -> Result<(), FetchError> {
        let next = self.base_url_for(instance)?;
        debug!(instance = %instance, "Switching active instance");
        *self.base_url.write() = next;
        Ok(())
    }

    pub fn state(&self) -> &AuthStateHolder {
        &self.state
    }

    /// Session request against the active instance.
    #[instrument(skip_all, fields(method = %method, endpoint = %endpoint))]
    pub async fn execute<T>(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
    ) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        let base = self.base_url();
        self.execute_at(&base, AuthMode::Session, method, endpoint, params).await
    }

    /// Request against an explicit base URL with an explicit auth mode.
    pub async fn execute_at<T>(
        &self,
        base: &Url,
        auth: AuthMode,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
    ) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        let descriptor = self.describe(base, auth, method, endpoint, params).await?;
        self.send(&descriptor).await
    }

    /// Build the descriptor, resolving the bearer token for `auth`.
    pub async fn describe(
        &self,
        base: &Url,
        auth: AuthMode,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
    ) -> FetchOutcome<RequestDescriptor> {
        let bearer = if endpoint.is_oauth() { None } else { self.bearer_for(auth).await? };
        RequestDescriptor::build(base, method, endpoint, params, bearer.as_ref())
    }

    /// Perform a prepared request and decode the payload.
    pub async fn send<T>(&self, descriptor: &RequestDescriptor) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.http.execute(descriptor).await?;
        let payload = classify(raw.status, raw.body).inspect_err(|err| {
            debug!(status = raw.status, error = %err, "Request rejected by server");
        })?;
        decode(&payload)
    }

    async fn bearer_for(&self, auth: AuthMode) -> FetchOutcome<Option<Token>> {
        match auth {
            AuthMode::Anonymous => Ok(None),
            AuthMode::Bearer(token) => Ok(Some(token)),
            AuthMode::Session => match self.state.snapshot() {
                AuthState::Authenticated(token) => Ok(Some(token)),
                AuthState::Refreshing => {
                    debug!("Waiting for token refresh before sending");
                    match self.state.wait_until_settled(self.settle_timeout).await {
                        Some(AuthState::Authenticated(token)) => Ok(Some(token)),
                        Some(_) => Ok(None),
                        None => {
                            warn!(timeout = ?self.settle_timeout, "Token refresh did not settle");
                            Err(FetchError::Transport(
                                "timed out waiting for token refresh".to_string(),
                            ))
                        }
                    }
                }
                AuthState::SignedOut | AuthState::SigninInProgress => Ok(None),
            },
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url().as_str())
            .field("state", &self.state.snapshot().name())
            .finish_non_exhaustive()
    }
}

/// Decode a successful payload. An empty body decodes as JSON `null`.
pub fn decode<T>(payload: &[u8]) -> FetchOutcome<T>
where
    T: DeserializeOwned,
{
    let payload = if payload.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { payload };
    serde_json::from_slice(payload).map_err(IntoFetchError::into_fetch_error)
}
