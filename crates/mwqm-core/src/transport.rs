//! Blocking HTTP seam used by the remote collaborators.
//!
//! [`ReqwestTransport`] talks to real services; tests substitute scripted
//! implementations of [`HttpTransport`].

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded lossily, truncated for log output.
    #[must_use]
    pub fn body_snippet(&self, max_chars: usize) -> String {
        String::from_utf8_lossy(&self.body)
            .chars()
            .take(max_chars)
            .collect()
    }
}

/// A request that produced no response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or similar
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Synchronous HTTP client.
pub trait HttpTransport {
    /// Issue a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response was received. Non-2xx
    /// statuses are returned as responses, not errors.
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;

    /// POST a JSON body, optionally with a bearer token.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::get`].
    fn post_json(
        &self,
        url: &str,
        body: &JsonValue,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }

    fn post_json(
        &self,
        url: &str,
        body: &JsonValue,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post_json(url, body, bearer)
    }
}

/// [`HttpTransport`] over `reqwest::blocking`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a preconfigured client (proxies, timeouts).
    #[must_use]
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    fn execute(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<HttpResponse, TransportError> {
        let response = request.send().map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(classify)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.execute(self.client.get(url))
    }

    fn post_json(
        &self,
        url: &str,
        body: &JsonValue,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        self.execute(request)
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}
