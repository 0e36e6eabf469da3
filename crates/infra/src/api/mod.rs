//! Fediverse API client
//!
//! Session management and the client surface consumed by the host.
//!
//! # Architecture
//!
//! - `Client` is the composition root; hosts build one with `ClientBuilder`
//! - `AuthController` owns the OAuth state machine and token refresh
//! - `DeepLinkRouter` dispatches URLs opened under the app's scheme
//! - All HTTP goes through `crate::http::RequestExecutor`, one attempt per
//!   call with bounded timeouts

pub mod auth;
pub mod client;
pub mod deeplink;

pub use auth::AuthController;
pub use client::{Client, ClientBuilder};
pub use deeplink::{ActionHandler, DeepLinkRouter, Route};
