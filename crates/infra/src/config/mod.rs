//! Configuration loading
//!
//! Reads [`starlight_domain::ClientConfig`] from config files and
//! `STARLIGHT_*` environment variables.

pub mod loader;

pub use loader::{apply_env_overrides, load, load_from_env, load_from_file, find_config_file};
