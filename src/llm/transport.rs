//! HTTP seam between the pipeline and the network.
//!
//! Providers build a [`WireRequest`] and parse a [`WireResponse`]; only the
//! transport touches the network. The pipeline owns the timeout, so a
//! transport never needs one of its own.

use crate::error::{OcrError, Result};
use std::future::Future;

/// A fully-encoded provider request. Headers may carry credentials, so
/// this is never logged.
#[derive(Clone)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait HttpTransport: Send + Sync {
    /// POST the request body as JSON and return the raw status + body.
    fn post(&self, request: WireRequest) -> impl Future<Output = Result<WireResponse>> + Send;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: WireRequest) -> Result<WireResponse> {
        let mut req = self.client.post(&request.url);
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }

        // without_url(): Gemini carries the API key in the query string.
        let response = req
            .json(&request.body)
            .send()
            .await
            .map_err(|e| OcrError::NetworkFailed(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| OcrError::NetworkFailed(e.without_url().to_string()))?;

        Ok(WireResponse { status, body })
    }
}
