//! Outbound client for the platform's session endpoint.
//!
//! The gatekeeper only ever issues one kind of call: a `GET` with a fixed,
//! minimal header set. [`UpstreamClient`] is the seam tests use to inject
//! fakes; [`ReqwestUpstream`] is the production implementation.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use http::StatusCode;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::GatekeeperConfig;
use crate::cookie::SESSION_COOKIE;
use crate::error::{BridgeError, BridgeResult};
use crate::middleware::BoxFuture;

/// A response received from the platform.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Create a response with an empty header map.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Message describing a failed response.
    ///
    /// The trimmed body text when there is one, otherwise a generic
    /// status-code message.
    pub fn failure_message(&self) -> String {
        match std::str::from_utf8(&self.body).map(str::trim) {
            Ok(text) if !text.is_empty() => text.to_string(),
            _ => format!("Request failed with status code {}", self.status.as_u16()),
        }
    }
}

/// Issues `GET` requests to the platform.
///
/// Implementations must not follow redirects: a `302` from the platform is
/// meaningful to the caller. A call that produced any HTTP response returns
/// `Ok`, whatever the status. `Err` is reserved for calls that received no
/// response at all, and should be [`BridgeError::Network`].
pub trait UpstreamClient: Send + Sync + 'static {
    /// Send a `GET` with exactly the given headers.
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, BridgeResult<UpstreamResponse>>;
}

/// Builds the only headers sent upstream: `Accept` and the session cookie.
pub fn session_headers(token: &str) -> BridgeResult<HeaderMap> {
    let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
        .map_err(|_| BridgeError::internal("session cookie is not a valid header value"))?;

    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(COOKIE, cookie);
    Ok(headers)
}

/// [`UpstreamClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: Client,
    timeout: Duration,
}

impl ReqwestUpstream {
    /// Create a client with the given overall request timeout.
    pub fn new(timeout: Duration) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| BridgeError::internal(format!("failed to create client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Create a client using the configured upstream timeout.
    pub fn from_config(config: &GatekeeperConfig) -> BridgeResult<Self> {
        Self::new(config.timeout())
    }

    /// Get the timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl UpstreamClient for ReqwestUpstream {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, BridgeResult<UpstreamResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .headers(headers)
                .send()
                .await
                .map_err(|e| BridgeError::network(format!("request failed: {e}")))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| BridgeError::network(format!("failed to read body: {e}")))?;

            Ok(UpstreamResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_headers() {
        let headers = session_headers("abc123").unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(
            headers.get(COOKIE).unwrap(),
            "AppServiceAuthSession=abc123"
        );
    }

    #[test]
    fn test_session_headers_rejects_control_chars() {
        assert!(session_headers("bad\r\nvalue").is_err());
    }

    #[test]
    fn test_failure_message_prefers_body() {
        let response = UpstreamResponse::new(StatusCode::FORBIDDEN, "  Access denied\n");
        assert_eq!(response.failure_message(), "Access denied");
    }

    #[test]
    fn test_failure_message_default() {
        let response = UpstreamResponse::new(StatusCode::NOT_FOUND, Bytes::new());
        assert_eq!(
            response.failure_message(),
            "Request failed with status code 404"
        );
    }

    #[test]
    fn test_is_success() {
        assert!(UpstreamResponse::new(StatusCode::OK, "{}").is_success());
        assert!(!UpstreamResponse::new(StatusCode::FOUND, "").is_success());
    }

    #[test]
    fn test_reqwest_client_timeout() {
        let client = ReqwestUpstream::new(Duration::from_secs(7)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = ReqwestUpstream::new(Duration::from_secs(2)).unwrap();
        let headers = session_headers("abc").unwrap();

        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/.auth/me");
        let err = client.get(&url, headers).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(matches!(err, BridgeError::Network { .. }));
    }
}
