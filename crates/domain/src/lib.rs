//! # Starlight Domain
//!
//! Pure types for the Starlight fediverse client core.
//!
//! This crate contains:
//! - Session types (InstanceDomain, Token, AuthState and its transitions)
//! - The endpoint catalogue and API data-transfer models
//! - The FetchError taxonomy and Result alias
//! - Client configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other Starlight crates
//! - No I/O; everything here is constructible in a unit test

pub mod macros;
pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
