//! Shared runtime pieces for the Starlight client crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: storage error types
//! - `runtime`: auth state, single-flight, credential helpers, test doubles
//! - `platform`: the keyring-backed [`security::KeychainProvider`]
//! - `observability`: tracing (implied by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod security;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{AuthStateHolder, CredentialStoreExt, Presenter, SecureCredentialStore, SingleFlight};
#[cfg(feature = "platform")]
pub use security::KeychainProvider;
#[cfg(feature = "foundation")]
pub use security::KeychainError;
