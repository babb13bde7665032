//! HTTP client for the campus REST API.
//!
//! Handles timeout management, URL construction, error classification, and
//! envelope decoding. Retrying failed fetches is the sync engine's job.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use cc_core::config::{AppConfig, ServerConfig};
use cc_core::error::{CcError, CcResult};

use crate::response::ApiResponse;

/// HTTP client for communicating with the campus API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Base URL including the `/api` prefix.
    base_url: Url,
    /// Whole-request timeout.
    timeout: Duration,
}

impl ApiClient {
    /// Create a new ApiClient from server configuration.
    pub fn new(config: &ServerConfig) -> CcResult<Self> {
        let sanitized = AppConfig::sanitize_base_url(&config.base_url);
        let base_url = Url::parse(&sanitized)
            .map_err(|e| CcError::Config(format!("invalid API base URL {sanitized:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CcError::Config(format!("API base URL {sanitized:?} cannot take paths")));
        }

        let timeout = Duration::from_millis(config.api_timeout_ms);
        let inner = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| CcError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url,
            timeout,
        })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the URL for `segments` under the base path. Segments are
    /// percent-encoded, so category names with spaces are safe.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> CcResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CcError::Config("API base URL cannot take paths".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(b) = body {
            builder = builder.json(b);
        }
        builder
    }

    /// Send a request and decode the envelope payload.
    ///
    /// Returns `Ok(None)` when a successful envelope carries no `data`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> CcResult<Option<T>> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url.path());

        let response = self
            .build_request(method, url, query, body)
            .send()
            .await
            .map_err(Self::classify_error)?;

        let response = Self::check_status(response).await?;
        let status = response.status().as_u16();
        let envelope: ApiResponse<T> = Self::parse_response(response).await?;
        envelope.into_data(status)
    }

    /// Like [`request`](Self::request) but a missing `data` field is an error.
    pub async fn request_data<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> CcResult<T> {
        self.request(method, segments, query, body)
            .await?
            .ok_or_else(|| CcError::RemoteRejected {
                status: 200,
                message: "response carried no data".into(),
            })
    }

    /// Decode a response body into the envelope.
    pub async fn parse_response<T: DeserializeOwned>(
        response: Response,
    ) -> CcResult<ApiResponse<T>> {
        let status = response.status().as_u16();
        let text = response.text().await.map_err(Self::classify_error)?;
        serde_json::from_str(&text).map_err(|e| CcError::RemoteRejected {
            status,
            message: format!("malformed response body: {e}"),
        })
    }

    /// Check the HTTP status code and convert failures to CcError.
    async fn check_status(response: Response) -> CcResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiResponse>(&body)
            .map(|env| env.error_message())
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body
                }
            });

        if status == StatusCode::NOT_FOUND {
            return Err(CcError::NotFound(message));
        }

        Err(CcError::RemoteRejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Classify a reqwest error. Anything that happened on the wire means the
    /// server could not be reached in a usable way.
    fn classify_error(e: reqwest::Error) -> CcError {
        if e.is_timeout() {
            CcError::RemoteUnavailable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            CcError::RemoteUnavailable(format!("connection failed: {e}"))
        } else if e.is_builder() {
            CcError::Internal(format!("invalid request: {e}"))
        } else {
            CcError::RemoteUnavailable(e.to_string())
        }
    }
}
