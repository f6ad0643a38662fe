//! Pass-through forwarding to the local application backend.

use std::time::Duration;

use easyauth_middleware::{BridgeError, BridgeResult, Request, Response};
use http::header::{HeaderMap, CONTENT_LENGTH, HOST};
use http_body_util::{BodyExt, Full};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;

use crate::error::{DevServerError, DevServerResult};

/// Forwards requests the gatekeeper passes through to a local backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DevServerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| DevServerError::server(format!("failed to create backend client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Get the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full backend URL for a request path and query.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    /// Forward a request and relay the backend's response.
    ///
    /// Any status from the backend is relayed as-is, redirects included.
    /// Only a failure to get a response at all is an error.
    pub async fn forward(&self, request: Request) -> BridgeResult<Response> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        let url = self.url_for(&path_and_query);

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        debug!(method = %parts.method, url = %url, "forwarding to backend");

        let response = self
            .client
            .request(parts.method, &url)
            .headers(filter_request_headers(&parts.headers))
            .body(body)
            .send()
            .await
            .map_err(|e| BridgeError::backend(format!("request failed: {e}")))?;

        let status = response.status();
        let headers = filter_response_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::backend(format!("failed to read body: {e}")))?;

        let mut relayed = http::Response::new(Full::new(body));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = headers;
        Ok(relayed)
    }
}

/// Check if a header is hop-by-hop (should not be forwarded).
pub fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Headers sent to the backend. `Host` and `Content-Length` are left to the
/// client, which sets them for the backend address and buffered body.
fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| {
            *name != HOST && *name != CONTENT_LENGTH && !is_hop_by_hop_header(name.as_str())
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
