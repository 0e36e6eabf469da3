//! Secure credential storage
//!
//! The error type is available from the foundation tier so storage
//! abstractions can name it; the keyring-backed provider needs `platform`.

pub mod error;
#[cfg(feature = "platform")]
pub mod keychain;

pub use error::KeychainError;
#[cfg(feature = "platform")]
pub use keychain::KeychainProvider;
