//! Routing for URLs opened under the host's registered scheme.

use std::fmt;
use std::sync::Arc;

use starlight_domain::constants::OAUTH_CALLBACK_HOST;
use starlight_domain::FetchError;
use tracing::debug;
use url::Url;

/// Callback invoked with the full URL when an action route matches.
pub type ActionHandler = Arc<dyn Fn(&Url) + Send + Sync>;

/// Where an incoming URL should go.
#[derive(Clone)]
pub enum Route {
    /// `{prefix}://oauth?...`, the sign-in redirect.
    OAuthCallback(Url),
    /// A registered action whose key occurs in the URL.
    Action { key: String, url: Url, handler: ActionHandler },
    /// Our scheme, but nothing registered for it.
    Unhandled(Url),
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuthCallback(url) => f.debug_tuple("OAuthCallback").field(&url.scheme()).finish(),
            Self::Action { key, url, .. } => {
                f.debug_struct("Action").field("key", key).field("url", &url.as_str()).finish()
            }
            Self::Unhandled(url) => f.debug_tuple("Unhandled").field(&url.as_str()).finish(),
        }
    }
}

/// Ordered action handlers, matched by substring on the URL.
#[derive(Clone, Default)]
pub struct DeepLinkRouter {
    actions: Vec<(String, ActionHandler)>,
}

impl DeepLinkRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for URLs containing `key`. Earlier registrations
    /// win when several keys match.
    pub fn register<F>(&mut self, key: impl Into<String>, handler: F)
    where
        F: Fn(&Url) + Send + Sync + 'static,
    {
        self.actions.push((key.into(), Arc::new(handler)));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Classify `raw` for the scheme `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedCallback` if `raw` is not a URL or uses another
    /// scheme.
    pub fn route(&self, prefix: &str, raw: &str) -> Result<Route, FetchError> {
        let url = Url::parse(raw)
            .map_err(|e| FetchError::MalformedCallback(format!("not a URL: {e}")))?;

        if !url.scheme().eq_ignore_ascii_case(prefix) {
            return Err(FetchError::MalformedCallback(format!(
                "unexpected scheme {:?}, expected {prefix:?}",
                url.scheme()
            )));
        }

        if url.host_str() == Some(OAUTH_CALLBACK_HOST) {
            debug!("Routing OAuth callback");
            return Ok(Route::OAuthCallback(url));
        }

        let matched = self.actions.iter().find(|(key, _)| raw.contains(key.as_str()));
        Ok(match matched {
            Some((key, handler)) => {
                debug!(key = %key, "Routing deep link to action");
                Route::Action { key: key.clone(), url, handler: Arc::clone(handler) }
            }
            None => {
                debug!(url = %url, "No action registered for deep link");
                Route::Unhandled(url)
            }
        })
    }
}

impl fmt::Debug for DeepLinkRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.actions.iter().map(|(key, _)| key.as_str()).collect();
        f.debug_struct("DeepLinkRouter").field("actions", &keys).finish()
    }
}
