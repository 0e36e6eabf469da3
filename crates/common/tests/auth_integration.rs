//! Integration tests for the auth building blocks
//!
//! Exercises the state holder, single-flight refresh slot and typed
//! credential helpers together, the way the session controller combines
//! them.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use starlight_common::auth::{AuthStateHolder, CredentialStoreExt, SecureCredentialStore, SingleFlight};
use starlight_common::testing::MockCredentialStore;
use starlight_domain::constants::keys;
use starlight_domain::{AuthStage, AuthState, FetchError, Token};

/// Validates that a token persisted by one "process" decides the initial
/// state of the next.
///
/// Assertions:
/// - An empty store yields `SignedOut`.
/// - A store containing a token yields `Authenticated` with that token.
#[tokio::test(flavor = "multi_thread")]
async fn test_initial_state_follows_persisted_token() {
    let store = MockCredentialStore::new();
    let initial = store.load_token().await.unwrap().map_or(AuthState::SignedOut, AuthState::Authenticated);
    assert_eq!(initial, AuthState::SignedOut);

    store.store_token(&Token::new("persisted")).await.unwrap();

    let restarted = MockCredentialStore::with_entries([(keys::ACCESS_TOKEN, "persisted")]);
    let initial = restarted
        .load_token()
        .await
        .unwrap()
        .map_or(AuthState::SignedOut, AuthState::Authenticated);
    assert_eq!(initial, AuthState::Authenticated(Token::new("persisted")));
}

/// Validates the refresh choreography: one refresh for many waiters, and
/// readers never see a torn state.
///
/// Assertions:
/// - The refresh body runs once for ten concurrent callers.
/// - Every caller receives the refreshed token.
/// - Observers only ever see whole `AuthState` values.
#[tokio::test(flavor = "multi_thread")]
async fn test_single_flight_refresh_with_observable_state() {
    let state = AuthStateHolder::new(AuthState::Authenticated(Token::new("old")));
    let store = MockCredentialStore::new();
    let flight = Arc::new(SingleFlight::<Token, FetchError>::new());
    let runs = Arc::new(AtomicUsize::new(0));

    let mut observer = state.subscribe();
    let seen = tokio::spawn(async move {
        let mut names = Vec::new();
        while observer.changed().await.is_ok() {
            let current = observer.borrow_and_update().clone();
            names.push(current.name());
            if current.is_authenticated() {
                break;
            }
        }
        names
    });

    let mut callers = Vec::new();
    for _ in 0..10 {
        let state = state.clone();
        let store = store.clone();
        let flight = Arc::clone(&flight);
        let runs = Arc::clone(&runs);
        callers.push(tokio::spawn(async move {
            flight
                .run(move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    state.transition(AuthState::Refreshing).map_err(|e| FetchError::auth(
                        AuthStage::Refresh,
                        e.to_string(),
                    ))?;
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    let fresh = Token::new("new").with_scope("read write follow push");
                    store.store_token(&fresh).await?;
                    state
                        .transition(AuthState::Authenticated(fresh.clone()))
                        .map_err(|e| FetchError::auth(AuthStage::Refresh, e.to_string()))?;
                    Ok(fresh)
                })
                .await
        }));
    }

    for caller in callers {
        let token = caller.await.unwrap().unwrap();
        assert_eq!(token.access_token, "new");
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(store.value(keys::ACCESS_TOKEN).as_deref(), Some("new"));
    // watch coalesces updates, so intermediate states may be skipped, but
    // every observed value is a whole state and the last one is the result.
    let names = seen.await.unwrap();
    assert_eq!(names.last(), Some(&"authenticated"));
    assert!(names.iter().all(|n| matches!(*n, "refreshing" | "authenticated")));
}

/// Validates sign-out clears both the store and the state, and is safe to
/// repeat.
#[tokio::test(flavor = "multi_thread")]
async fn test_sign_out_is_idempotent() {
    let state = AuthStateHolder::new(AuthState::Authenticated(Token::new("t")));
    let store = MockCredentialStore::with_entries([
        (keys::INSTANCE_DOMAIN, "mastodon.social"),
        (keys::CLIENT_ID, "id"),
        (keys::CLIENT_SECRET, "secret"),
        (keys::ACCESS_TOKEN, "t"),
    ]);

    for _ in 0..2 {
        state.sign_out();
        store.clear_session().await.unwrap();
        assert_eq!(state.snapshot(), AuthState::SignedOut);
        assert!(store.is_empty());
    }

    assert_eq!(store.get(keys::ACCESS_TOKEN).await.unwrap(), None);
}
