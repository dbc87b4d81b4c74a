//! HTTP transport for the request service.
//!
//! [`HttpClient`] is the seam between the submission flow and the network:
//! production code talks through [`ReqwestHttpClient`], tests through
//! [`MockHttpClient`](super::MockHttpClient).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::ApiCall;
use crate::error::TransportError;

/// Raw response; status interpretation happens in [`ApiClient`](super::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute one call. Only transport failures are errors; any status code
    /// the server answers with comes back as an [`HttpResponse`].
    async fn execute(&self, call: &ApiCall) -> Result<HttpResponse, TransportError>;
}

#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ReqwestHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(
        name = "http.client",
        skip(self, call),
        fields(http.method = %call.method, url.path = %call.path, http.response.status_code)
    )]
    async fn execute(&self, call: &ApiCall) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, call.path);

        let mut req = self.client.request(call.method.clone(), &url);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        if let Some(body) = &call.body {
            req = req
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "HTTP request failed");
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::Span::current().record("http.response.status_code", status as i64);
        tracing::debug!(status, response_len = body.len(), "HTTP request completed");

        Ok(HttpResponse { status, body })
    }
}
