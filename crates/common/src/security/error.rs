//! Errors raised by secure credential storage

use starlight_domain::FetchError;
use thiserror::Error;

/// Keychain error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

impl From<KeychainError> for FetchError {
    fn from(err: KeychainError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_storage_error() {
        let err: FetchError = KeychainError::AccessFailed("locked".into()).into();
        assert_eq!(err, FetchError::Storage("Keychain access failed: locked".into()));
    }
}
