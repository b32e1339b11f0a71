//! Upstream transport abstraction.
//!
//! The orchestrator needs exactly one capability from the HTTP client:
//! perform a request and report the outcome with enough classification to
//! drive fallback. [`ReqwestTransport`] is the default implementation;
//! anything implementing [`Transport`] can stand in (tests use mocks).

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use thiserror::Error;
use url::Url;

/// An outbound API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// A GET request with no extra headers.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
        }
    }

    /// Attach a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A complete upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Recoverable upstream failures.
///
/// All variants funnel into the same fallback transition; the distinction
/// exists for observability and for the failure hook.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream timed out")]
    Timeout,
    #[error("upstream transport error: {message}")]
    Io { message: String },
    #[error("upstream protocol error: {message}")]
    Protocol { message: String },
}

impl TransportError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Performs the real network request.
///
/// Implementations must not apply their own retry or caching; the
/// orchestrator owns the timeout and the fallback sequence.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: &ApiRequest) -> Result<UpstreamResponse, TransportError>;
}

/// [`Transport`] implementation over a shared [`reqwest::Client`].
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: &ApiRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(classify_send_error)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::protocol(err.to_string()))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() || err.is_request() {
        TransportError::io(err.to_string())
    } else {
        TransportError::protocol(err.to_string())
    }
}
