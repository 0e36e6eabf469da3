//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory doubles for the host capabilities
//!   ([`MockCredentialStore`], [`MockPresenter`])
//!
//! ## Usage
//!
//! ```rust
//! use starlight_common::auth::CredentialStoreExt;
//! use starlight_common::testing::MockCredentialStore;
//! use starlight_domain::Token;
//!
//! # tokio_test::block_on(async {
//! let store = MockCredentialStore::new();
//! store.store_token(&Token::new("abc")).await.unwrap();
//! assert_eq!(store.value("starlight_access_token").as_deref(), Some("abc"));
//! # });
//! ```

pub mod mocks;

pub use mocks::{MockCredentialStore, MockPresenter};
