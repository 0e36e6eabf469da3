use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use starlight_domain::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RESOURCE_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use starlight_domain::{ClientConfig, FetchError, HttpMethod};
use tracing::debug;

use super::request::RequestDescriptor;
use crate::errors::IntoFetchError;

/// Status and raw payload of a completed exchange, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Thin wrapper over `reqwest` with the client-wide timeouts, user agent
/// and cache policy applied. Each call is a single attempt.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client configured from [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, FetchError> {
        Self::builder()
            .request_timeout(config.request_timeout())
            .resource_timeout(config.resource_timeout())
            .user_agent(config.user_agent.clone())
            .build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Translate a descriptor into a ready-to-send request.
    pub fn prepare(&self, descriptor: &RequestDescriptor) -> Result<RequestBuilder, FetchError> {
        let mut builder = self.request(to_method(descriptor.method), descriptor.full_url());

        for (name, value) in &descriptor.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                FetchError::InvalidRequest(format!("invalid header name {name:?}: {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                FetchError::InvalidRequest(format!("invalid value for header {name}: {err}"))
            })?;
            builder = builder.header(name, value);
        }

        if let Some(body) = descriptor.encoded_body() {
            builder = builder.body(body);
        }

        Ok(builder)
    }

    /// Perform the request once and read the whole payload.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, FetchError> {
        let request = self
            .prepare(descriptor)?
            .build()
            .map_err(IntoFetchError::into_fetch_error)?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %url.path(), "sending HTTP request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%method, url = %url.path(), error = %err, "HTTP request failed");
                return Err(err.into_fetch_error());
            }
        };

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(IntoFetchError::into_fetch_error)?;
        debug!(%method, url = %url.path(), status, bytes = body.len(), "received HTTP response");

        Ok(RawResponse { status, body: body.to_vec() })
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    request_timeout: Duration,
    resource_timeout: Duration,
    user_agent: String,
    revalidate: bool,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            resource_timeout: Duration::from_secs(DEFAULT_RESOURCE_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            revalidate: true,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    /// Limit for establishing the connection.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Limit for the whole exchange including the body.
    pub fn resource_timeout(mut self, timeout: Duration) -> Self {
        self.resource_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Send `Cache-Control: no-cache` on every request (on by default).
    pub fn revalidate(mut self, enabled: bool) -> Self {
        self.revalidate = enabled;
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, FetchError> {
        let mut headers = self.default_headers.unwrap_or_default();
        if self.revalidate {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }

        let client = ReqwestClient::builder()
            .connect_timeout(self.request_timeout)
            .timeout(self.resource_timeout)
            .user_agent(self.user_agent)
            .default_headers(headers)
            .no_proxy()
            .build()
            .map_err(IntoFetchError::into_fetch_error)?;

        Ok(HttpClient { client })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use starlight_domain::{Endpoint, Token};
    use url::Url;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::request::RequestParams;

    fn client() -> HttpClient {
        HttpClient::builder()
            .user_agent("Starlight-Test/1.0")
            .request_timeout(Duration::from_secs(2))
            .resource_timeout(Duration::from_secs(5))
            .build()
            .expect("http client")
    }

    fn describe(
        server: &MockServer,
        method: HttpMethod,
        endpoint: &Endpoint,
        params: RequestParams,
        bearer: Option<&Token>,
    ) -> RequestDescriptor {
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        RequestDescriptor::build(&base, method, endpoint, params, bearer).unwrap()
    }

    #[tokio::test]
    async fn sends_single_attempt_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1"))
            .and(header("user-agent", "Starlight-Test/1.0"))
            .and(header("cache-control", "no-cache"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(1)
            .mount(&server)
            .await;

        let token = Token::new("abc");
        let descriptor = describe(
            &server,
            HttpMethod::Get,
            &Endpoint::account("1"),
            RequestParams::new(),
            Some(&token),
        );
        let raw = client().execute(&descriptor).await.expect("response");

        assert_eq!(raw, RawResponse { status: 503, body: b"busy".to_vec() });
    }

    #[tokio::test]
    async fn sends_form_body_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(query_param("trace", "1"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("code=x%2Fy&grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor = describe(
            &server,
            HttpMethod::Post,
            &Endpoint::Token,
            RequestParams::new()
                .query("trace", "1")
                .form("grant_type", "authorization_code")
                .form("code", "x/y"),
            None,
        );
        let raw = client().execute(&descriptor).await.expect("response");

        assert_eq!(raw.status, 200);
    }

    #[tokio::test]
    async fn connection_refused_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let descriptor = RequestDescriptor::build(
            &base,
            HttpMethod::Get,
            &Endpoint::VerifyCredentials,
            RequestParams::new(),
            None,
        )
        .unwrap();

        let err = client().execute(&descriptor).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_response_times_out_as_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = HttpClient::builder()
            .resource_timeout(Duration::from_millis(50))
            .build()
            .expect("http client");
        let descriptor = describe(
            &server,
            HttpMethod::Get,
            &Endpoint::Conversations,
            RequestParams::new(),
            None,
        );

        let err = client.execute(&descriptor).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(ref m) if m.contains("timed out")), "got {err:?}");
    }

    #[test]
    fn invalid_header_value_is_invalid_request() {
        let base = Url::parse("https://mastodon.social/").unwrap();
        let descriptor = RequestDescriptor::build(
            &base,
            HttpMethod::Get,
            &Endpoint::Conversations,
            RequestParams::new().header("X-Bad", "line\nbreak"),
            None,
        )
        .unwrap();

        let err = client().prepare(&descriptor).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }
}
