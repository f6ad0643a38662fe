//! Credentialed CORS headers for the gatekeeper's own endpoints.
//!
//! Unlike a general CORS layer, this policy is not consulted for arbitrary
//! requests. It is applied only to responses the gatekeeper produces itself
//! (redirects, proxied session JSON and preflights). Browsers reject a
//! wildcard origin on credentialed requests, so the allowed origin is always
//! a single explicit value.
//!
//! ## Headers
//!
//! - `Access-Control-Allow-Credentials: true`
//! - `Access-Control-Allow-Origin: <configured origin>`
//! - `Access-Control-Allow-Methods: GET, OPTIONS`

use http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH,
};
use http::StatusCode;

use crate::config::{parse_origin, ConfigError, GatekeeperConfig};
use crate::types::{Response, ResponseExt};

/// Methods advertised on the gatekeeper's endpoints.
pub const ALLOWED_METHODS: &str = "GET, OPTIONS";

/// The fixed credentialed CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
}

impl CorsPolicy {
    /// Creates a policy for a single allowed origin.
    pub fn new(allow_origin: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            allow_origin: parse_origin(allow_origin.trim())?,
        })
    }

    /// Creates the policy from an already validated gatekeeper configuration.
    pub fn from_config(config: &GatekeeperConfig) -> Self {
        Self {
            allow_origin: config.allow_origin_header().clone(),
        }
    }

    /// Returns the allowed origin.
    pub fn allow_origin(&self) -> &HeaderValue {
        &self.allow_origin
    }

    /// Sets all three CORS headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
    }

    /// Creates the 204 No Content preflight response.
    ///
    /// Carries `Content-Length: 0`. HTTP/1 hosts built on hyper drop that
    /// header from 204 responses on the wire.
    pub fn preflight_response(&self) -> Response {
        let mut response = Response::empty(StatusCode::NO_CONTENT);
        self.apply(response.headers_mut());
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_apply_sets_all_headers() {
        let cors = CorsPolicy::new("http://localhost:3000").unwrap();
        let mut map = HeaderMap::new();
        map.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

        cors.apply(&mut map);

        assert_eq!(map.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        assert_eq!(
            map.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            map.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, OPTIONS"
        );
        assert_eq!(map.get_all(ACCESS_CONTROL_ALLOW_ORIGIN).iter().count(), 1);
    }

    #[test]
    fn test_rejects_wildcard_as_config_error() {
        let err = CorsPolicy::new("*").unwrap_err();
        assert!(err.to_string().contains("invalid gatekeeper configuration"));
        assert!(err.to_string().contains("wildcard"));
    }

    #[test]
    fn test_rejects_invalid_origin_as_config_error() {
        let err = CorsPolicy::new("http://a\nb").unwrap_err();
        assert!(err.to_string().contains("allow_origin"));
    }

    #[test]
    fn test_from_config() {
        let config = GatekeeperConfig::new("myapp.azurewebsites.net", 4200).unwrap();
        let cors = CorsPolicy::from_config(&config);
        assert_eq!(cors.allow_origin(), "http://localhost:4200");
    }

    #[tokio::test]
    async fn test_preflight_response() {
        let cors = CorsPolicy::new("http://localhost:3000").unwrap();
        let response = cors.preflight_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "0");
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
