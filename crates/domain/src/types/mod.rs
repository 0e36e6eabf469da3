//! Domain types and models

pub mod auth;
pub mod endpoint;
pub mod models;

pub use auth::{ApplicationCredentials, AuthState, InstanceDomain, InvalidTransition, Token};
pub use endpoint::{Endpoint, HttpMethod, TimelineScope};
pub use models::{Account, Application, Conversation, Status, TokenResponse, Visibility};
