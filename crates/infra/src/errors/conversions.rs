//! Conversions from external infrastructure errors into [`FetchError`].

use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use starlight_domain::FetchError;
use url::ParseError as UrlError;

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
pub(crate) trait IntoFetchError {
    fn into_fetch_error(self) -> FetchError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FetchError */
/* -------------------------------------------------------------------------- */

impl IntoFetchError for HttpError {
    fn into_fetch_error(self) -> FetchError {
        if self.is_builder() {
            return FetchError::InvalidRequest(format!("could not build HTTP request: {self}"));
        }

        if self.is_timeout() {
            return FetchError::Transport(format!("HTTP request timed out: {self}"));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return FetchError::Transport(format!("HTTP connection failure: {self}"));
        }

        if self.is_body() || self.is_decode() {
            return FetchError::Transport(format!("HTTP body could not be read: {self}"));
        }

        FetchError::Transport(self.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → FetchError */
/* -------------------------------------------------------------------------- */

impl IntoFetchError for JsonError {
    fn into_fetch_error(self) -> FetchError {
        FetchError::Parse(format!(
            "{} at line {} column {}",
            self,
            self.line(),
            self.column()
        ))
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → FetchError */
/* -------------------------------------------------------------------------- */

impl IntoFetchError for UrlError {
    fn into_fetch_error(self) -> FetchError {
        FetchError::InvalidRequest(format!("invalid URL: {self}"))
    }
}
