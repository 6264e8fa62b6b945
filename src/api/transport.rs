//! Outgoing-request abstraction between the interceptor and the wire.
//!
//! The interceptor never talks to `reqwest` directly; it decides what to
//! attach to an `OutgoingRequest` and hands it to a `Transport`. Production
//! uses `HttpTransport`; tests substitute a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Description of an outgoing API request: method, URL, headers, and an
/// optional JSON body. The interceptor attaches a credential by building a
/// copy with an added header, never by mutating the caller's request.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: header::HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl OutgoingRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: header::HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path component of the URL (no scheme, host, or query), used for the
    /// refresh-endpoint exclusion match.
    pub fn path(&self) -> &str {
        let after_scheme = match self.url.find("://") {
            Some(i) => &self.url[i + 3..],
            None => &self.url,
        };
        let path = match after_scheme.find('/') {
            Some(i) => &after_scheme[i..],
            None => "/",
        };
        match path.find('?') {
            Some(i) => &path[..i],
            None => path,
        }
    }

    /// Copy of this request carrying `Authorization: Bearer <token>`. An
    /// existing authorization header is overwritten.
    pub fn with_bearer(&self, token: &str) -> Result<Self, ApiError> {
        let mut request = self.clone();
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| {
                ApiError::InvalidResponse("Credential is not a valid header value".into())
            })?;
        request.headers.insert(header::AUTHORIZATION, value);
        Ok(request)
    }
}

/// Response as seen by the interceptor: status plus the raw body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TransportResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response JSON: {}", e))
        })
    }
}

/// The underlying wire. Injected into the interceptor so tests can observe
/// exactly what was forwarded.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: OutgoingRequest) -> Result<TransportResponse, ApiError>;
}

/// Production transport over a shared `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: OutgoingRequest) -> Result<TransportResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(TransportResponse { status, body })
    }
}
