//! Session building blocks for the OAuth client core
//!
//! This module holds the pieces of authentication that don't perform HTTP:
//! the host capabilities, typed credential persistence, the observable auth
//! state and the single-flight primitive used for token refresh. The
//! controller that drives them over the network lives in `starlight-infra`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  AuthController  │  (starlight-infra) OAuth state machine
//! └────────┬─────────┘
//!          │
//!          ├──► AuthStateHolder        (watch-backed observable state)
//!          ├──► SingleFlight           (one refresh at a time)
//!          ├──► CredentialStoreExt     (typed keys over the store)
//!          │         │
//!          │         └──► SecureCredentialStore  (KeychainProvider / mock)
//!          │
//!          └──► Presenter              (host opens the authorize URL)
//! ```
//!
//! # Usage Example
//!
//! ```rust
//! use starlight_common::auth::AuthStateHolder;
//! use starlight_domain::{AuthState, Token};
//!
//! let state = AuthStateHolder::default();
//! let mut changes = state.subscribe();
//!
//! state.transition(AuthState::SigninInProgress).unwrap();
//! state.transition(AuthState::Authenticated(Token::new("abc"))).unwrap();
//!
//! assert!(changes.has_changed().unwrap());
//! assert!(changes.borrow_and_update().is_authenticated());
//! ```

pub mod credentials;
pub mod single_flight;
pub mod state;
pub mod traits;

pub use credentials::CredentialStoreExt;
pub use single_flight::{FlightAborted, SingleFlight};
pub use state::AuthStateHolder;
pub use traits::{Presenter, SecureCredentialStore};
