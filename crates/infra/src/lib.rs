//! # Starlight Infrastructure
//!
//! I/O side of the Starlight client core.
//!
//! This crate contains:
//! - The HTTP pipeline (request construction, transport, status
//!   classification, decoding)
//! - The OAuth session controller and deep-link routing
//! - The [`Client`] composition root used by host applications
//! - Configuration loading from files and environment
//!
//! ## Architecture
//! - Pure types live in `starlight-domain`
//! - Auth state, single-flight and credential storage come from
//!   `starlight-common`

pub mod api;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::{AuthController, Client, ClientBuilder, DeepLinkRouter, Route};
pub use http::{AuthMode, HttpClient, RequestDescriptor, RequestExecutor, RequestParams};
