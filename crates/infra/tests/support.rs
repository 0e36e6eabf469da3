//! Shared fixtures for the infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use starlight_common::auth::{Presenter, SecureCredentialStore};
use starlight_common::testing::{MockCredentialStore, MockPresenter};
use starlight_domain::ClientConfig;
use starlight_infra::Client;
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

/// Install a test-friendly subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `host:port` of the mock server, usable as an instance domain.
pub fn domain_of(server: &MockServer) -> String {
    server.address().to_string()
}

/// Plain-HTTP configuration pointing at `server`.
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_scheme: "http".into(),
        default_instance: domain_of(server),
        user_agent: "Starlight-Tests/1.0".into(),
        request_timeout_secs: 2,
        resource_timeout_secs: 5,
        ..ClientConfig::default()
    }
}

/// A client wired to in-memory doubles that the test keeps handles to.
pub struct Harness {
    pub server: MockServer,
    pub store: MockCredentialStore,
    pub presenter: MockPresenter,
    pub client: Client,
}

impl Harness {
    pub async fn start() -> Self {
        Self::with_store(MockCredentialStore::new()).await
    }

    /// Start with `store` pre-populated, as if restoring a previous session.
    pub async fn with_store(store: MockCredentialStore) -> Self {
        init_tracing();
        let server = MockServer::start().await;
        let presenter = MockPresenter::new();
        let client = build_client(&server, &store, &presenter).await;
        Self { server, store, presenter, client }
    }

    /// Rebuild the client over the same store, simulating a process restart.
    pub async fn rebuild(mut self) -> Self {
        self.client = build_client(&self.server, &self.store, &self.presenter).await;
        self
    }

    pub fn domain(&self) -> String {
        domain_of(&self.server)
    }
}

async fn build_client(
    server: &MockServer,
    store: &MockCredentialStore,
    presenter: &MockPresenter,
) -> Client {
    let store: Arc<dyn SecureCredentialStore> = Arc::new(store.clone());
    let presenter: Arc<dyn Presenter> = Arc::new(presenter.clone());
    Client::builder()
        .config(config_for(server))
        .store(store)
        .presenter(presenter)
        .build()
        .await
        .expect("client should build")
}
