//! Side-effect-free request construction
//!
//! A [`RequestDescriptor`] is everything needed to perform one HTTP call:
//! resolved URL, query, optional form body and headers, including the
//! bearer token when the session is authenticated. Building one never
//! touches the network, so the encoding rules are unit-testable.

use std::collections::BTreeMap;
use std::fmt;

use starlight_domain::{Endpoint, FetchError, HttpMethod, Token};
use url::form_urlencoded;
use url::Url;

/// Ordered string parameters (query, form body or headers).
pub type Params = BTreeMap<String, String>;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";

/// Caller-supplied parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub query: Params,
    /// Form fields; only valid on `POST`.
    pub body: Option<Params>,
    pub headers: Params,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a form field, creating the body if needed.
    #[must_use]
    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.get_or_insert_with(Params::new).insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body
            .get_or_insert_with(Params::new)
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Fully resolved description of one HTTP call.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    /// Endpoint URL without the query string.
    pub url: Url,
    pub query: Params,
    pub body: Option<Params>,
    pub headers: Params,
}

impl RequestDescriptor {
    /// Resolve `endpoint` against `base` and apply the encoding rules.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidRequest` when a body is supplied on a
    /// method other than `POST`, when a path parameter is empty, `.` or
    /// `..`, or when `base` cannot carry a path.
    pub fn build(
        base: &Url,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
        bearer: Option<&Token>,
    ) -> Result<Self, FetchError> {
        let RequestParams { query: extra_query, body, mut headers } = params;

        if body.is_some() && !method.allows_body() {
            return Err(FetchError::InvalidRequest(format!(
                "{} {endpoint} cannot carry a form body",
                method.as_str().to_uppercase()
            )));
        }

        let url = resolve(base, endpoint)?;

        let mut query: Params = endpoint
            .fixed_query()
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        query.extend(extra_query);

        if body.is_some() {
            headers.insert(CONTENT_TYPE.to_string(), FORM_CONTENT_TYPE.to_string());
        }
        if let Some(token) = bearer {
            headers.insert(AUTHORIZATION.to_string(), token.bearer());
        }

        Ok(Self { method, url, query, body, headers })
    }

    /// URL including the encoded query string.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }

    /// `application/x-www-form-urlencoded` body, if any.
    pub fn encoded_body(&self) -> Option<String> {
        self.body.as_ref().map(|fields| {
            form_urlencoded::Serializer::new(String::new()).extend_pairs(fields.iter()).finish()
        })
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.header(AUTHORIZATION).is_some()
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let shown = if k.eq_ignore_ascii_case(AUTHORIZATION) { "[REDACTED]" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        let body_keys: Option<Vec<&str>> =
            self.body.as_ref().map(|b| b.keys().map(String::as_str).collect());

        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("query", &self.query)
            .field("body_fields", &body_keys)
            .field("headers", &headers)
            .finish()
    }
}

fn resolve(base: &Url, endpoint: &Endpoint) -> Result<Url, FetchError> {
    let segments = endpoint.segments();
    // `PathSegmentsMut` silently drops these, which would address another resource.
    if let Some(bad) = segments.iter().find(|s| matches!(s.as_ref(), "" | "." | "..")) {
        return Err(FetchError::InvalidRequest(format!(
            "{endpoint} has an unusable path parameter {bad:?}"
        )));
    }

    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| FetchError::InvalidRequest(format!("base URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use starlight_domain::TimelineScope;

    use super::*;

    fn base() -> Url {
        Url::parse("https://mastodon.social/").unwrap()
    }

    #[test]
    fn test_get_puts_params_in_query() {
        let descriptor = RequestDescriptor::build(
            &base(),
            HttpMethod::Get,
            &Endpoint::Timeline(TimelineScope::Local),
            RequestParams::new().query("limit", "20"),
            None,
        )
        .unwrap();

        assert_eq!(descriptor.url.as_str(), "https://mastodon.social/api/v1/timelines/public");
        assert_eq!(
            descriptor.full_url().as_str(),
            "https://mastodon.social/api/v1/timelines/public?limit=20&local=true"
        );
        assert!(descriptor.body.is_none());
        assert!(descriptor.header(CONTENT_TYPE).is_none());
        assert!(!descriptor.is_authenticated());
    }

    #[test]
    fn test_post_form_encodes_body() {
        let descriptor = RequestDescriptor::build(
            &base(),
            HttpMethod::Post,
            &Endpoint::RegisterApp,
            RequestParams::new()
                .form("client_name", "Starlight")
                .form("scopes", "read write follow push")
                .form("redirect_uris", "starlight://oauth"),
            None,
        )
        .unwrap();

        assert_eq!(descriptor.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(
            descriptor.encoded_body().unwrap(),
            "client_name=Starlight&redirect_uris=starlight%3A%2F%2Foauth&scopes=read+write+follow+push"
        );
    }

    #[test]
    fn test_body_on_get_is_rejected() {
        let err = RequestDescriptor::build(
            &base(),
            HttpMethod::Get,
            &Endpoint::account("1"),
            RequestParams::new().form("oops", "1"),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest(ref m) if m.contains("GET /api/v1/accounts/1")));
    }

    #[test]
    fn test_bearer_attached_and_redacted_in_debug() {
        let token = Token::new("sekrit");
        let descriptor = RequestDescriptor::build(
            &base(),
            HttpMethod::Get,
            &Endpoint::VerifyCredentials,
            RequestParams::new(),
            Some(&token),
        )
        .unwrap();

        assert_eq!(descriptor.header("authorization"), Some("Bearer sekrit"));
        assert!(!format!("{descriptor:?}").contains("sekrit"));
    }

    #[test]
    fn test_path_parameters_are_single_encoded_segments() {
        let descriptor = RequestDescriptor::build(
            &base(),
            HttpMethod::Get,
            &Endpoint::Timeline(TimelineScope::Tag { tag: "c#/rust é".into() }),
            RequestParams::new(),
            None,
        )
        .unwrap();

        assert_eq!(
            descriptor.url.as_str(),
            "https://mastodon.social/api/v1/timelines/tag/c%23%2Frust%20%C3%A9"
        );
    }

    #[test]
    fn test_base_with_port_and_http_scheme() {
        let base = Url::parse("http://127.0.0.1:8080/").unwrap();
        let descriptor = RequestDescriptor::build(
            &base,
            HttpMethod::Get,
            &Endpoint::account("1"),
            RequestParams::new(),
            None,
        )
        .unwrap();
        assert_eq!(descriptor.url.as_str(), "http://127.0.0.1:8080/api/v1/accounts/1");
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        for endpoint in [
            Endpoint::account(".."),
            Endpoint::account(""),
            Endpoint::Timeline(TimelineScope::Tag { tag: ".".into() }),
        ] {
            let err = RequestDescriptor::build(
                &base(),
                HttpMethod::Get,
                &endpoint,
                RequestParams::new(),
                None,
            )
            .unwrap_err();
            assert!(matches!(err, FetchError::InvalidRequest(_)), "{endpoint}: {err:?}");
        }
    }
}
