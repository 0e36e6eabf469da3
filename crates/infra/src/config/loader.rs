//! Configuration loader
//!
//! Builds a [`ClientConfig`] from an optional file plus environment
//! overrides.
//!
//! ## Loading Strategy
//! 1. Start from the built-in defaults
//! 2. Overlay the first config file found (see [`find_config_file`]);
//!    fields missing from the file keep their defaults
//! 3. Apply `STARLIGHT_*` environment overrides
//! 4. Validate
//!
//! ## Environment Variables
//! - `STARLIGHT_CLIENT_NAME`: name sent at app registration
//! - `STARLIGHT_WEBSITE`: website sent at app registration (empty clears it)
//! - `STARLIGHT_URL_PREFIX`: OAuth callback scheme
//! - `STARLIGHT_DEFAULT_INSTANCE`: instance used before sign-in
//! - `STARLIGHT_API_SCHEME`: `https` (or `http` for local servers)
//! - `STARLIGHT_USER_AGENT`
//! - `STARLIGHT_REQUEST_TIMEOUT`: seconds
//! - `STARLIGHT_RESOURCE_TIMEOUT`: seconds
//! - `STARLIGHT_KEYCHAIN_SERVICE`
//! - `STARLIGHT_ACCESS_TOKEN`: preset token, never persisted
//!
//! ## File Locations
//! `starlight.toml`, `starlight.json`, `config.toml`, `config.json` in the
//! working directory, its parent and grandparent, then next to the
//! executable.

use std::path::{Path, PathBuf};

use starlight_domain::{ClientConfig, ConfigError};

type Result<T> = std::result::Result<T, ConfigError>;

const FILE_NAMES: [&str; 4] = ["starlight.toml", "starlight.json", "config.toml", "config.json"];

/// Load configuration: defaults, then file (if any), then environment.
///
/// # Errors
/// Returns `ConfigError` if a config file exists but cannot be parsed, an
/// environment override is malformed, or the result fails validation.
pub fn load() -> Result<ClientConfig> {
    let base = match find_config_file() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            ClientConfig::default()
        }
    };

    let config = apply_env_overrides(base)?;
    config.validate()?;
    Ok(config)
}

/// Defaults plus environment overrides, ignoring config files.
///
/// # Errors
/// Returns `ConfigError` for malformed overrides or an invalid result.
pub fn load_from_env() -> Result<ClientConfig> {
    let config = apply_env_overrides(ClientConfig::default())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. Format is detected by
/// extension (`.json` or `.toml`). The file is not validated here.
///
/// # Errors
/// Returns `ConfigError` if the file is missing, unreadable or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            ConfigError("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ConfigError(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => {
            toml::from_str(contents).map_err(|e| ConfigError(format!("Invalid TOML format: {e}")))
        }
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError(format!("Invalid JSON format: {e}"))),
        _ => Err(ConfigError(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.extend(cwd.ancestors().skip(1).take(2).map(Path::to_path_buf));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Overlay `STARLIGHT_*` variables onto `config`.
///
/// # Errors
/// Returns `ConfigError` if a timeout variable is not a whole number.
pub fn apply_env_overrides(mut config: ClientConfig) -> Result<ClientConfig> {
    if let Some(value) = env_opt("STARLIGHT_CLIENT_NAME") {
        config.client_name = value;
    }
    if let Ok(value) = std::env::var("STARLIGHT_WEBSITE") {
        config.website = Some(value).filter(|w| !w.trim().is_empty());
    }
    if let Some(value) = env_opt("STARLIGHT_URL_PREFIX") {
        config.url_prefix = value;
    }
    if let Some(value) = env_opt("STARLIGHT_DEFAULT_INSTANCE") {
        config.default_instance = value;
    }
    if let Some(value) = env_opt("STARLIGHT_API_SCHEME") {
        config.api_scheme = value.to_ascii_lowercase();
    }
    if let Some(value) = env_opt("STARLIGHT_USER_AGENT") {
        config.user_agent = value;
    }
    if let Some(secs) = env_secs("STARLIGHT_REQUEST_TIMEOUT")? {
        config.request_timeout_secs = secs;
    }
    if let Some(secs) = env_secs("STARLIGHT_RESOURCE_TIMEOUT")? {
        config.resource_timeout_secs = secs;
    }
    if let Some(value) = env_opt("STARLIGHT_KEYCHAIN_SERVICE") {
        config.keychain_service = value;
    }
    if let Some(value) = env_opt("STARLIGHT_ACCESS_TOKEN") {
        tracing::debug!("Using preset access token from environment");
        config.preset_token = Some(value);
    }
    Ok(config)
}

/// Non-empty environment variable, trimmed.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_secs(key: &str) -> Result<Option<u64>> {
    env_opt(key)
        .map(|s| s.parse::<u64>().map_err(|e| ConfigError(format!("Invalid {key}: {e}"))))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: [&str; 10] = [
        "STARLIGHT_CLIENT_NAME",
        "STARLIGHT_WEBSITE",
        "STARLIGHT_URL_PREFIX",
        "STARLIGHT_DEFAULT_INSTANCE",
        "STARLIGHT_API_SCHEME",
        "STARLIGHT_USER_AGENT",
        "STARLIGHT_REQUEST_TIMEOUT",
        "STARLIGHT_RESOURCE_TIMEOUT",
        "STARLIGHT_KEYCHAIN_SERVICE",
        "STARLIGHT_ACCESS_TOKEN",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let config = load_from_env().unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STARLIGHT_URL_PREFIX", "hyperspace");
        std::env::set_var("STARLIGHT_DEFAULT_INSTANCE", "hachyderm.io");
        std::env::set_var("STARLIGHT_REQUEST_TIMEOUT", "15");
        std::env::set_var("STARLIGHT_WEBSITE", "");
        std::env::set_var("STARLIGHT_ACCESS_TOKEN", "dev-token");

        let config = load_from_env();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.url_prefix, "hyperspace");
        assert_eq!(config.default_instance, "hachyderm.io");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.resource_timeout_secs, 120);
        assert_eq!(config.website, None);
        assert_eq!(config.preset_token.as_deref(), Some("dev-token"));
    }

    #[test]
    fn test_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STARLIGHT_RESOURCE_TIMEOUT", "two minutes");
        let result = load_from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.0.contains("STARLIGHT_RESOURCE_TIMEOUT"), "{err}");
    }

    #[test]
    fn test_env_result_is_validated() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STARLIGHT_API_SCHEME", "ftp");
        let result = load_from_env();
        clear_env();

        assert!(result.is_err(), "ftp scheme should fail validation");
    }

    #[test]
    fn test_load_from_file_toml_keeps_defaults_for_missing_fields() {
        let path = temp_config(
            r#"
url_prefix = "hyperspace"
default_instance = "mastodon.social"
request_timeout_secs = 30
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.url_prefix, "hyperspace");
        assert_eq!(config.default_instance, "mastodon.social");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.client_name, "Starlight");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = temp_config(r#"{ "client_name": "Hyperspace", "api_scheme": "https" }"#, "json");

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.client_name, "Hyperspace");
        assert_eq!(config.url_prefix, "starlight");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/starlight.toml"))).unwrap_err();
        assert!(err.0.contains("not found"));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = temp_config(r#"{ "client_name": "#, "json");
        assert!(load_from_file(Some(path.clone())).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("client_name: x", Path::new("starlight.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_preset_token_is_not_serialized() {
        let config = ClientConfig { preset_token: Some("secret".into()), ..ClientConfig::default() };
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("preset_token"));
    }
}
