//! Client composition root
//!
//! [`Client`] is what a host application holds: it wires the credential
//! store, the auth controller and the request executor together and exposes
//! typed calls for the endpoints the app uses.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use starlight_common::auth::{Presenter, SecureCredentialStore};
use starlight_common::KeychainProvider;
use starlight_domain::{
    Account, AuthState, ClientConfig, Conversation, Endpoint, FetchError, FetchOutcome,
    HttpMethod, Status, TimelineScope, Token,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::auth::AuthController;
use super::deeplink::{DeepLinkRouter, Route};
use crate::http::RequestParams;

/// Session-aware API client for one fediverse account.
#[derive(Clone)]
pub struct Client {
    auth: AuthController,
    router: Arc<RwLock<DeepLinkRouter>>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn auth(&self) -> &AuthController {
        &self.auth
    }

    /* ------------------------------------------------------------------ */
    /* Requests */
    /* ------------------------------------------------------------------ */

    /// Execute a request against the active instance and decode the reply.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`]: transport failures, status classification
    /// (`NotFound`, `Client`, `Server`, `Unknown`), `Parse` for payloads that
    /// don't match `T`, `InvalidRequest` for a body on a non-POST method.
    pub async fn request<T>(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
    ) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        self.auth.executor().execute(method, endpoint, params).await
    }

    /// `request` with the endpoint's usual method.
    pub async fn get<T>(&self, endpoint: &Endpoint, params: RequestParams) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        self.request(endpoint.default_method(), endpoint, params).await
    }

    /// `request` that gives up with `FetchError::Cancelled` once `cancel`
    /// fires. The in-flight transfer is dropped.
    pub async fn request_cancellable<T>(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
        cancel: &CancellationToken,
    ) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(endpoint = %endpoint, "Request cancelled");
                Err(FetchError::Cancelled)
            }
            outcome = self.request(method, endpoint, params) => outcome,
        }
    }

    #[instrument(skip(self))]
    pub async fn account(&self, id: &str) -> FetchOutcome<Account> {
        self.get(&Endpoint::account(id), RequestParams::new()).await
    }

    /// Account of the signed-in user.
    pub async fn verify_credentials(&self) -> FetchOutcome<Account> {
        self.get(&Endpoint::VerifyCredentials, RequestParams::new()).await
    }

    /// Statuses of a timeline. For [`TimelineScope::Messages`] these are the
    /// latest statuses of each direct conversation.
    #[instrument(skip(self, params))]
    pub async fn timeline(
        &self,
        scope: TimelineScope,
        params: RequestParams,
    ) -> FetchOutcome<Vec<Status>> {
        let endpoint = Endpoint::Timeline(scope);
        if matches!(endpoint, Endpoint::Timeline(TimelineScope::Messages)) {
            let conversations: Vec<Conversation> = self.get(&endpoint, params).await?;
            return Ok(conversations.into_iter().filter_map(|c| c.last_status).collect());
        }
        self.get(&endpoint, params).await
    }

    pub async fn conversations(&self) -> FetchOutcome<Vec<Conversation>> {
        self.get(&Endpoint::Conversations, RequestParams::new()).await
    }

    /* ------------------------------------------------------------------ */
    /* Session */
    /* ------------------------------------------------------------------ */

    pub async fn start_login(&self, domain: &str) -> FetchOutcome<Url> {
        self.auth.start_login(domain).await
    }

    pub async fn complete_login(&self, code: &str) -> FetchOutcome<()> {
        self.auth.complete_login(code).await
    }

    pub async fn complete_login_from_callback(&self, callback: &str) -> FetchOutcome<()> {
        self.auth.complete_login_from_callback(callback).await
    }

    /// Handle a URL opened under the app's scheme.
    ///
    /// OAuth callbacks finish the sign-in; action routes run their handler.
    /// The resolved route is returned either way.
    ///
    /// # Errors
    ///
    /// `MalformedCallback` for foreign schemes, plus anything the sign-in
    /// exchange returns.
    pub async fn handle_url(&self, raw: &str) -> FetchOutcome<Route> {
        let route = self.router.read().route(&self.auth.url_prefix(), raw)?;
        match &route {
            Route::OAuthCallback(url) => self.auth.complete_login_from_callback(url.as_str()).await?,
            Route::Action { url, handler, .. } => handler(url),
            Route::Unhandled(_) => {}
        }
        Ok(route)
    }

    /// Register a deep-link action for URLs containing `key`.
    pub fn register_action<F>(&self, key: impl Into<String>, handler: F)
    where
        F: Fn(&Url) + Send + Sync + 'static,
    {
        self.router.write().register(key, handler);
    }

    pub async fn sign_out(&self) -> FetchOutcome<()> {
        self.auth.sign_out().await
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    pub async fn refresh_session(&self) -> FetchOutcome<Token> {
        self.auth.refresh().await
    }

    /* ------------------------------------------------------------------ */
    /* Instance and scheme */
    /* ------------------------------------------------------------------ */

    pub fn base_url(&self) -> Url {
        self.auth.executor().base_url()
    }

    pub fn url_prefix(&self) -> String {
        self.auth.url_prefix()
    }

    pub fn redirect_uri(&self) -> String {
        self.auth.redirect_uri()
    }

    pub async fn set_url_prefix(&self, prefix: &str) -> FetchOutcome<()> {
        self.auth.set_url_prefix(prefix).await
    }

    pub async fn reset_url_prefix(&self) -> FetchOutcome<()> {
        self.auth.reset_url_prefix().await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url().as_str())
            .field("auth", &self.auth)
            .field("router", &*self.router.read())
            .finish()
    }
}

/// Builder for [`Client`]
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<dyn SecureCredentialStore>>,
    presenter: Option<Arc<dyn Presenter>>,
    router: DeepLinkRouter,
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Credential store; defaults to the platform keychain under
    /// `config.keychain_service`.
    pub fn store(mut self, store: Arc<dyn SecureCredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Capability used to show the authorization URL.
    pub fn presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn action<F>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Url) + Send + Sync + 'static,
    {
        self.router.register(key, handler);
        self
    }

    /// Validate the configuration and restore the stored session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an invalid configuration, or whatever
    /// [`AuthController::initialize`] returns.
    pub async fn build(self) -> FetchOutcome<Client> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let store: Arc<dyn SecureCredentialStore> = match self.store {
            Some(store) => store,
            None => Arc::new(KeychainProvider::new(config.keychain_service.clone())),
        };

        let auth = AuthController::initialize(config, store, self.presenter).await?;
        Ok(Client { auth, router: Arc::new(RwLock::new(self.router)) })
    }
}

#[cfg(test)]
mod tests {
    use starlight_common::testing::{MockCredentialStore, MockPresenter};
    use starlight_domain::constants::keys;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> Client {
        let address = server.address().to_string();
        let store = MockCredentialStore::with_entries([(keys::INSTANCE_DOMAIN, address.as_str())]);
        Client::builder()
            .config(ClientConfig { api_scheme: "http".into(), ..ClientConfig::default() })
            .store(Arc::new(store))
            .presenter(Arc::new(MockPresenter::new()))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let err = Client::builder()
            .config(ClientConfig { request_timeout_secs: 0, ..ClientConfig::default() })
            .store(Arc::new(MockCredentialStore::new()))
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_local_timeline_adds_local_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/timelines/public"))
            .and(query_param("local", "true"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let statuses = client
            .timeline(TimelineScope::Local, RequestParams::new().query("limit", "2"))
            .await
            .unwrap();
        assert!(statuses.is_empty());
    }

    #[tokio::test]
    async fn test_messages_timeline_flattens_conversations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "1", "accounts": [], "unread": false, "last_status": {"id": "10", "content": "hi"}},
                {"id": "2", "accounts": [], "unread": true, "last_status": null}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let statuses = client.timeline(TimelineScope::Messages, RequestParams::new()).await.unwrap();

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].id, "10");
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = client
            .request_cancellable::<Account>(
                HttpMethod::Get,
                &Endpoint::account("1"),
                RequestParams::new(),
                &cancel,
            )
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Cancelled);
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_carry_no_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1", "username": "Gargron", "acct": "Gargron"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let account = client.account("1").await.unwrap();
        assert_eq!(account.username, "Gargron");

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.headers.contains_key("authorization")));
    }
}
