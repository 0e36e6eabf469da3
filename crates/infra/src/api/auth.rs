//! OAuth session controller
//!
//! Drives dynamic application registration, the authorization-code
//! exchange, sign-out and token refresh, publishing every step through the
//! shared [`AuthStateHolder`] so request execution always reads a
//! consistent state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use starlight_common::auth::{CredentialStoreExt, Presenter, SecureCredentialStore};
use starlight_common::{AuthStateHolder, SingleFlight};
use starlight_domain::constants::{
    GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN, OAUTH_CALLBACK_HOST, OAUTH_RESPONSE_TYPE,
    OAUTH_SCOPES,
};
use starlight_domain::{
    validate_url_prefix, Account, Application, ApplicationCredentials, AuthStage, AuthState,
    ClientConfig, Endpoint, FetchError, FetchOutcome, HttpMethod, InstanceDomain, Token,
    TokenResponse,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::http::{AuthMode, RequestDescriptor, RequestExecutor, RequestParams};

struct Inner {
    config: ClientConfig,
    store: Arc<dyn SecureCredentialStore>,
    executor: Arc<RequestExecutor>,
    url_prefix: RwLock<String>,
    presenter: Option<Arc<dyn Presenter>>,
    refresh: SingleFlight<Token, FetchError>,
}

/// OAuth state machine for one client session. Clones share the session.
#[derive(Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

impl AuthController {
    /// Restore the session from the credential store.
    ///
    /// The initial state is `Authenticated` when a token is stored (or a
    /// preset token is configured), `SignedOut` otherwise. Requests target
    /// the stored instance, falling back to `default_instance`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the configured default instance is not a
    /// valid domain, or a transport error if the HTTP client cannot be built.
    pub async fn initialize(
        config: ClientConfig,
        store: Arc<dyn SecureCredentialStore>,
        presenter: Option<Arc<dyn Presenter>>,
    ) -> FetchOutcome<Self> {
        let initial = match &config.preset_token {
            Some(preset) => {
                debug!("Starting from preset access token");
                AuthState::Authenticated(Token::new(preset.clone()))
            }
            None => match store.load_token().await {
                Ok(Some(token)) => AuthState::Authenticated(token),
                Ok(None) => AuthState::SignedOut,
                Err(e) => {
                    warn!(error = %e, "Could not read stored token, starting signed out");
                    AuthState::SignedOut
                }
            },
        };

        let instance = match store.load_instance().await {
            Ok(Some(domain)) => domain,
            Ok(None) => InstanceDomain::parse(&config.default_instance)?,
            Err(e) => {
                warn!(error = %e, "Could not read stored instance, using default");
                InstanceDomain::parse(&config.default_instance)?
            }
        };

        info!(instance = %instance, state = initial.name(), "Auth session initialized");

        let state = AuthStateHolder::new(initial);
        let executor = Arc::new(RequestExecutor::new(&config, state, &instance)?);
        Ok(Self::with_executor(config, store, executor, presenter))
    }

    /// Assemble a controller around an existing executor.
    pub fn with_executor(
        config: ClientConfig,
        store: Arc<dyn SecureCredentialStore>,
        executor: Arc<RequestExecutor>,
        presenter: Option<Arc<dyn Presenter>>,
    ) -> Self {
        let url_prefix = RwLock::new(config.url_prefix.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                executor,
                url_prefix,
                presenter,
                refresh: SingleFlight::new(),
            }),
        }
    }

    pub fn state(&self) -> &AuthStateHolder {
        self.inner.executor.state()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state().subscribe()
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.inner.executor
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /* ------------------------------------------------------------------ */
    /* Sign-in */
    /* ------------------------------------------------------------------ */

    /// Register the application with `domain` and return the authorization
    /// URL for the host to present.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `domain` is not a valid host (state unchanged)
    /// - `Auth { stage: Registration }` if registration or persisting its
    ///   result fails; the state reverts to `SignedOut`
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn start_login(&self, domain: &str) -> FetchOutcome<Url> {
        let domain = InstanceDomain::parse(domain)?;
        if self.snapshot().is_refreshing() {
            return Err(FetchError::auth(
                AuthStage::Registration,
                "cannot start a sign-in while the session is refreshing",
            ));
        }

        let redirect_uri = self.redirect_uri();
        let base = self.inner.executor.base_url_for(&domain)?;

        let mut params = RequestParams::new()
            .form("client_name", self.inner.config.client_name.as_str())
            .form("redirect_uris", redirect_uri.as_str())
            .form("scopes", OAUTH_SCOPES);
        if let Some(website) = &self.inner.config.website {
            params = params.form("website", website.as_str());
        }

        let application: Application = match self
            .inner
            .executor
            .execute_at(&base, AuthMode::Anonymous, HttpMethod::Post, &Endpoint::RegisterApp, params)
            .await
        {
            Ok(application) => application,
            Err(err) => {
                return Err(self.abandon_login(FetchError::auth_caused_by(
                    AuthStage::Registration,
                    format!("application registration with {domain} failed"),
                    err,
                )).await);
            }
        };
        let credentials = application.credentials();
        debug!(client_id = %credentials.client_id, "Application registered");

        if let Err(err) = self.persist_registration(&domain, &credentials).await {
            return Err(self.abandon_login(FetchError::auth_caused_by(
                AuthStage::Registration,
                "could not store application credentials",
                err,
            )).await);
        }

        self.inner.executor.set_instance(&domain)?;
        self.state().transition(AuthState::SigninInProgress).map_err(|e| {
            FetchError::auth(AuthStage::Registration, e.to_string())
        })?;

        let url = authorize_url(&base, &credentials, &redirect_uri)?;
        if let Some(presenter) = &self.inner.presenter {
            if let Err(reason) = presenter.open(&url) {
                warn!(reason = %reason, "Presenter could not open the authorization URL");
            }
        }

        info!("Sign-in started");
        Ok(url)
    }

    /// Exchange an authorization code for a token.
    ///
    /// # Errors
    ///
    /// - `MalformedCallback` for an empty code (state unchanged)
    /// - `Auth { stage: Exchange }` while a session is active or refreshing
    ///   (state unchanged)
    /// - `Auth { stage: Exchange }` when no application is registered, the
    ///   exchange fails or the token cannot be stored; the state reverts to
    ///   `SignedOut`
    #[instrument(skip_all)]
    pub async fn complete_login(&self, code: &str) -> FetchOutcome<()> {
        if code.is_empty() {
            return Err(FetchError::MalformedCallback("authorization code is empty".into()));
        }
        self.ensure_can_complete()?;
        if !matches!(self.snapshot(), AuthState::SigninInProgress) {
            self.state()
                .transition(AuthState::SigninInProgress)
                .map_err(|e| FetchError::auth(AuthStage::Exchange, e.to_string()))?;
        }

        let (domain, credentials) = match self.load_registration().await {
            Ok(Some(registration)) => registration,
            Ok(None) => {
                return Err(self.abandon_login(FetchError::auth(
                    AuthStage::Exchange,
                    "no registered application; start a sign-in first",
                )).await);
            }
            Err(err) => {
                return Err(self.abandon_login(FetchError::auth_caused_by(
                    AuthStage::Exchange,
                    "could not read stored application credentials",
                    err,
                )).await);
            }
        };

        let base = self.inner.executor.base_url_for(&domain)?;
        let params = RequestParams::new()
            .form("client_id", credentials.client_id.as_str())
            .form("client_secret", credentials.client_secret.as_str())
            .form("redirect_uri", self.redirect_uri())
            .form("grant_type", GRANT_AUTHORIZATION_CODE)
            .form("code", code)
            .form("scope", OAUTH_SCOPES);

        let response: TokenResponse = match self
            .inner
            .executor
            .execute_at(&base, AuthMode::Anonymous, HttpMethod::Post, &Endpoint::Token, params)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return Err(self.abandon_login(FetchError::auth_caused_by(
                    AuthStage::Exchange,
                    "token exchange failed",
                    err,
                )).await);
            }
        };
        let token = Token::from(response);

        if let Err(err) = self.inner.store.store_token(&token).await {
            return Err(self.abandon_login(FetchError::auth_caused_by(
                AuthStage::Exchange,
                "could not store access token",
                err.into(),
            )).await);
        }
        if let Err(err) = self.inner.executor.set_instance(&domain) {
            return Err(self.abandon_login(err).await);
        }

        self.state()
            .transition(AuthState::Authenticated(token))
            .map_err(|e| FetchError::auth(AuthStage::Exchange, e.to_string()))?;

        info!(instance = %domain, "Signed in");
        Ok(())
    }

    /// Finish sign-in from the redirect URL the host received.
    ///
    /// # Errors
    ///
    /// - `MalformedCallback` if `callback` is not a URL or has no `code`
    ///   (state unchanged)
    /// - `Auth { stage: Exchange }` if the server reported an `error`
    ///   instead of a code (state reverts to `SignedOut`), or anything
    ///   [`complete_login`](Self::complete_login) returns
    pub async fn complete_login_from_callback(&self, callback: &str) -> FetchOutcome<()> {
        let url = Url::parse(callback)
            .map_err(|e| FetchError::MalformedCallback(format!("callback is not a URL: {e}")))?;
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(code) = query.get("code").filter(|code| !code.is_empty()) {
            return self.complete_login(code).await;
        }

        if let Some(error) = query.get("error") {
            self.ensure_can_complete()?;
            let message = match query.get("error_description") {
                Some(description) => format!("authorization was refused: {error} ({description})"),
                None => format!("authorization was refused: {error}"),
            };
            return Err(self.abandon_login(FetchError::auth(AuthStage::Exchange, message)).await);
        }

        Err(FetchError::MalformedCallback("callback is missing the `code` parameter".into()))
    }

    /// Forget the session. Safe to call in any state, any number of times.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a stored key could not be deleted; the state is
    /// `SignedOut` regardless.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> FetchOutcome<()> {
        let previous = self.state().sign_out();
        self.inner.store.clear_session().await?;
        info!(from = previous.name(), "Signed out");
        Ok(())
    }

    /* ------------------------------------------------------------------ */
    /* Refresh */
    /* ------------------------------------------------------------------ */

    /// Renew the session token. Concurrent callers share one refresh.
    ///
    /// With a stored refresh token this runs the `refresh_token` grant;
    /// otherwise it re-verifies the current token. Rejected credentials sign
    /// the session out; transport and server failures keep the old token.
    pub async fn refresh(&self) -> FetchOutcome<Token> {
        let this = self.clone();
        self.inner.refresh.run(move || async move { this.run_refresh().await }).await
    }

    #[instrument(skip_all)]
    async fn run_refresh(&self) -> FetchOutcome<Token> {
        let current = match self.snapshot() {
            AuthState::Authenticated(token) => token,
            other => {
                return Err(FetchError::auth(
                    AuthStage::Refresh,
                    format!("cannot refresh while {other}"),
                ));
            }
        };
        self.state()
            .transition(AuthState::Refreshing)
            .map_err(|e| FetchError::auth(AuthStage::Refresh, e.to_string()))?;

        match self.renew(&current).await {
            Ok(token) => {
                self.state()
                    .transition(AuthState::Authenticated(token.clone()))
                    .map_err(|e| FetchError::auth(AuthStage::Refresh, e.to_string()))?;
                if self.is_preset(&current) {
                    debug!("Preset session refreshed, not persisting");
                } else if let Err(e) = self.inner.store.store_token(&token).await {
                    warn!(error = %e, "Refreshed token could not be stored");
                }
                info!("Session refreshed");
                Ok(token)
            }
            Err(err) if err.is_credential_rejection() => {
                warn!(error = %err, "Session credentials rejected, signing out");
                self.state().sign_out();
                if let Err(e) = self.inner.store.clear_token().await {
                    warn!(error = %e, "Rejected token could not be removed");
                }
                Err(FetchError::auth_caused_by(AuthStage::Refresh, "session is no longer valid", err))
            }
            Err(err) => {
                warn!(error = %err, "Refresh failed, keeping current token");
                if let Err(e) = self.state().transition(AuthState::Authenticated(current)) {
                    debug!(error = %e, "Session changed during refresh");
                }
                Err(err)
            }
        }
    }

    async fn renew(&self, current: &Token) -> FetchOutcome<Token> {
        let executor = &self.inner.executor;

        let Some(refresh_token) = &current.refresh_token else {
            let _: Account = executor
                .execute_at(
                    &executor.base_url(),
                    AuthMode::Bearer(current.clone()),
                    HttpMethod::Get,
                    &Endpoint::VerifyCredentials,
                    RequestParams::new(),
                )
                .await?;
            return Ok(current.clone());
        };

        let (domain, credentials) = self.load_registration().await?.ok_or_else(|| {
            FetchError::auth(AuthStage::Refresh, "no registered application to refresh against")
        })?;

        let base = executor.base_url_for(&domain)?;
        let params = RequestParams::new()
            .form("grant_type", GRANT_REFRESH_TOKEN)
            .form("refresh_token", refresh_token.as_str())
            .form("client_id", credentials.client_id.as_str())
            .form("client_secret", credentials.client_secret.as_str())
            .form("scope", current.scope.as_deref().unwrap_or(OAUTH_SCOPES));

        let response: TokenResponse = executor
            .execute_at(&base, AuthMode::Anonymous, HttpMethod::Post, &Endpoint::Token, params)
            .await?;

        let mut token = Token::from(response);
        if token.refresh_token.is_none() {
            token.refresh_token = current.refresh_token.clone();
        }
        if token.scope.is_none() {
            token.scope = current.scope.clone();
        }
        Ok(token)
    }

    /* ------------------------------------------------------------------ */
    /* URL prefix */
    /* ------------------------------------------------------------------ */

    pub fn url_prefix(&self) -> String {
        self.inner.url_prefix.read().clone()
    }

    /// `{prefix}://oauth`
    pub fn redirect_uri(&self) -> String {
        format!("{}://{}", self.inner.url_prefix.read(), OAUTH_CALLBACK_HOST)
    }

    /// Change the callback scheme.
    ///
    /// Applications registered under the old prefix keep its redirect URI,
    /// so exchanges fail until the next `start_login` re-registers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if `prefix` is not a valid URL scheme.
    pub async fn set_url_prefix(&self, prefix: &str) -> FetchOutcome<()> {
        validate_url_prefix(prefix).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let previous = std::mem::replace(&mut *self.inner.url_prefix.write(), prefix.to_string());
        if previous == prefix {
            return Ok(());
        }
        debug!(from = %previous, to = %prefix, "URL prefix changed");

        if matches!(self.inner.store.load_application().await, Ok(Some(_))) {
            warn!(
                prefix = %prefix,
                "Stored application was registered with another redirect URI; sign in again to re-register"
            );
        }
        Ok(())
    }

    /// Restore the configured prefix.
    pub async fn reset_url_prefix(&self) -> FetchOutcome<()> {
        let default = self.inner.config.url_prefix.clone();
        self.set_url_prefix(&default).await
    }

    /* ------------------------------------------------------------------ */
    /* Helpers */
    /* ------------------------------------------------------------------ */

    /// Revert to `SignedOut` after a failed sign-in. Any stored token goes
    /// too, so a restart cannot resurrect the session the state dropped.
    async fn abandon_login(&self, err: FetchError) -> FetchError {
        let previous = self.state().sign_out();
        warn!(from = previous.name(), error = %err, "Sign-in abandoned");
        if let Err(e) = self.inner.store.clear_token().await {
            warn!(error = %e, "Stale token could not be removed");
        }
        err
    }

    fn is_preset(&self, token: &Token) -> bool {
        self.inner.config.preset_token.as_deref() == Some(token.access_token.as_str())
    }

    /// A code can only complete a sign-in that is pending or not started.
    fn ensure_can_complete(&self) -> FetchOutcome<()> {
        match self.snapshot() {
            AuthState::SignedOut | AuthState::SigninInProgress => Ok(()),
            other => Err(FetchError::auth(
                AuthStage::Exchange,
                format!("cannot complete a sign-in while {other}; sign out first"),
            )),
        }
    }

    async fn persist_registration(
        &self,
        domain: &InstanceDomain,
        credentials: &ApplicationCredentials,
    ) -> FetchOutcome<()> {
        self.inner.store.store_instance(domain).await?;
        self.inner.store.store_application(credentials).await?;
        Ok(())
    }

    async fn load_registration(
        &self,
    ) -> FetchOutcome<Option<(InstanceDomain, ApplicationCredentials)>> {
        let domain = self.inner.store.load_instance().await?;
        let credentials = self.inner.store.load_application().await?;
        Ok(domain.zip(credentials))
    }
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("state", &self.snapshot().name())
            .field("url_prefix", &self.url_prefix())
            .field("refresh", &self.inner.refresh)
            .finish_non_exhaustive()
    }
}

fn authorize_url(
    base: &Url,
    credentials: &ApplicationCredentials,
    redirect_uri: &str,
) -> FetchOutcome<Url> {
    let params = RequestParams::new()
        .query("client_id", credentials.client_id.as_str())
        .query("redirect_uri", redirect_uri)
        .query("scope", OAUTH_SCOPES)
        .query("response_type", OAUTH_RESPONSE_TYPE);
    let descriptor =
        RequestDescriptor::build(base, HttpMethod::Get, &Endpoint::Authorize, params, None)?;
    Ok(descriptor.full_url())
}
