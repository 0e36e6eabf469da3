//! Platform keychain provider for session credentials
//!
//! Thin wrapper over the `keyring` crate storing each credential as one
//! entry under a configurable service name, on macOS (Keychain Access),
//! Windows (Credential Manager) and Linux (Secret Service API).
//!
//! ## Usage
//!
//! ```no_run
//! use starlight_common::security::keychain::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("net.marquiskurt.starlight-secrets");
//! keychain.set_secret("starlight_instance_domain", "mastodon.social")?;
//! let domain = keychain.get_secret("starlight_instance_domain")?;
//! assert_eq!(domain, "mastodon.social");
//! # Ok::<(), starlight_common::security::KeychainError>(())
//! ```

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::error::KeychainError;
use crate::auth::traits::SecureCredentialStore;

/// Keychain-backed [`SecureCredentialStore`].
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Arguments
    /// * `service_name` - Service identifier (e.g.,
    ///   "net.marquiskurt.starlight-secrets")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Store a secret value in the platform keychain
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })?;

        debug!(service = %self.service_name, key = %key, "Secret stored successfully");

        Ok(())
    }

    /// Retrieve a secret value from the platform keychain
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if secret doesn't exist
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {e}"))
            }
        })
    }

    /// Delete a secret from the platform keychain (idempotent)
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {key}: {e}"
            ))),
        }
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

impl KeychainProvider {
    /// Run a keychain call on the blocking pool; platform keychains may block
    /// on IPC or an unlock prompt.
    async fn blocking<T, F>(&self, op: F) -> Result<T, KeychainError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> Result<T, KeychainError> + Send + 'static,
    {
        let provider = self.clone();
        tokio::task::spawn_blocking(move || op(provider))
            .await
            .map_err(|e| KeychainError::AccessFailed(format!("Keychain task failed: {e}")))?
    }
}

#[async_trait]
impl SecureCredentialStore for KeychainProvider {
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError> {
        let key = key.to_string();
        self.blocking(move |provider| match provider.get_secret(&key) {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.blocking(move |provider| provider.set_secret(&key, &value)).await
    }

    async fn delete(&self, key: &str) -> Result<(), KeychainError> {
        let key = key.to_string();
        self.blocking(move |provider| provider.delete_secret(&key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keychain_provider_creation() {
        let keychain = KeychainProvider::new("test-service");
        assert_eq!(keychain.service_name(), "test-service");
    }
}
