//! Mock implementations of the host capabilities
//!
//! In-memory doubles for [`SecureCredentialStore`] and [`Presenter`] so auth
//! flows can run without a platform keychain or a browser.

// Allow missing error docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::auth::traits::{Presenter, SecureCredentialStore};
use crate::security::KeychainError;

#[derive(Debug, Default)]
struct StoreState {
    values: HashMap<String, String>,
    writes: HashMap<String, usize>,
    failing_deletes: HashSet<String>,
    fail_all: bool,
}

/// Credential store that keeps values in memory.
///
/// Clones share the same storage, so a test can keep a handle while the
/// controller owns another.
#[derive(Clone, Debug, Default)]
pub struct MockCredentialStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous process had written it.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for (key, value) in entries {
                state.values.insert(key.to_string(), value.to_string());
            }
        }
        store
    }

    /// Current value without going through the async trait.
    pub fn value(&self, key: &str) -> Option<String> {
        self.state.lock().values.get(key).cloned()
    }

    /// Number of successful `set` calls for `key`.
    pub fn write_count(&self, key: &str) -> usize {
        self.state.lock().writes.get(key).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    /// Make `delete(key)` fail with `AccessFailed`.
    pub fn fail_deletes_for(&self, key: &str) {
        self.state.lock().failing_deletes.insert(key.to_string());
    }

    /// Make every operation fail, simulating a locked keychain.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().fail_all = unavailable;
    }
}

fn unavailable() -> KeychainError {
    KeychainError::AccessFailed("mock keychain unavailable".to_string())
}

#[async_trait]
impl SecureCredentialStore for MockCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(unavailable());
        }
        Ok(state.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        let mut state = self.state.lock();
        if state.fail_all {
            return Err(unavailable());
        }
        state.values.insert(key.to_string(), value.to_string());
        *state.writes.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KeychainError> {
        let mut state = self.state.lock();
        if state.fail_all || state.failing_deletes.contains(key) {
            return Err(KeychainError::AccessFailed(format!("cannot delete {key}")));
        }
        state.values.remove(key);
        Ok(())
    }
}

/// Presenter that records every URL it is asked to open.
#[derive(Clone, Debug, Default)]
pub struct MockPresenter {
    opened: Arc<Mutex<Vec<Url>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A presenter whose `open` always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let presenter = Self::new();
        *presenter.failure.lock() = Some(reason.into());
        presenter
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().clone()
    }

    pub fn last_opened(&self) -> Option<Url> {
        self.opened.lock().last().cloned()
    }
}

impl Presenter for MockPresenter {
    fn open(&self, url: &Url) -> Result<(), String> {
        self.opened.lock().push(url.clone());
        self.failure.lock().clone().map_or(Ok(()), Err)
    }
}
