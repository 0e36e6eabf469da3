//! HTTP plumbing: request construction, transport, status classification
//! and the session-aware executor.

pub mod classifier;
pub mod client;
pub mod executor;
pub mod request;

pub use classifier::classify;
pub use client::{HttpClient, HttpClientBuilder, RawResponse};
pub use executor::{decode, AuthMode, RequestExecutor};
pub use request::{Params, RequestDescriptor, RequestParams};
