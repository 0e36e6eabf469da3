//! Capabilities the host supplies to the auth layer
//!
//! These traits enable dependency injection and testing by abstracting
//! the two side effects the client core never performs on its own:
//! persisting secrets and showing a URL to the user.

use async_trait::async_trait;
use url::Url;

use crate::security::KeychainError;

/// Scoped key-value store for secrets that survives process restarts.
///
/// Implementations must treat `delete` of a missing key as success.
#[async_trait]
pub trait SecureCredentialStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key has never been written.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backing store fails
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError>;

    /// Write or overwrite a value.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backing store fails
    async fn set(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Remove a value (idempotent).
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backing store fails
    async fn delete(&self, key: &str) -> Result<(), KeychainError>;
}

/// Host capability that shows an authorization URL to the user, typically
/// by opening a browser or an in-app web session.
pub trait Presenter: Send + Sync {
    /// # Errors
    /// Returns a description of why the URL could not be presented
    fn open(&self, url: &Url) -> Result<(), String>;
}

impl<F> Presenter for F
where
    F: Fn(&Url) -> Result<(), String> + Send + Sync,
{
    fn open(&self, url: &Url) -> Result<(), String> {
        self(url)
    }
}
