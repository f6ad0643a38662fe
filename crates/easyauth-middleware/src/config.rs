//! Gatekeeper configuration.
//!
//! Captured once at construction and never mutated afterwards.

use std::time::Duration;

use http::HeaderValue;
use thiserror::Error;

/// Default timeout for the upstream session call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Invalid gatekeeper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid gatekeeper configuration: {message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Immutable settings for a [`Gatekeeper`](crate::stages::Gatekeeper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatekeeperConfig {
    remote_host: String,
    allow_origin: HeaderValue,
    upstream_timeout: Duration,
}

impl GatekeeperConfig {
    /// Creates a configuration allowing `http://localhost:{local_port}`.
    ///
    /// # Example
    ///
    /// ```
    /// use easyauth_middleware::GatekeeperConfig;
    ///
    /// let config = GatekeeperConfig::new("myapp.azurewebsites.net", 3000).unwrap();
    /// assert_eq!(config.allow_origin(), "http://localhost:3000");
    /// ```
    pub fn new(remote_host: impl Into<String>, local_port: u16) -> Result<Self, ConfigError> {
        Self::with_origin(remote_host, format!("http://localhost:{local_port}"))
    }

    /// Creates a configuration with an explicit allowed origin.
    pub fn with_origin(
        remote_host: impl Into<String>,
        allow_origin: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let remote_host = remote_host.into();
        validate_host(&remote_host)?;
        let allow_origin = parse_origin(allow_origin.into().trim())?;

        Ok(Self {
            remote_host,
            allow_origin,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        })
    }

    /// Sets the timeout for the upstream session call.
    #[must_use]
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Remote host, without scheme.
    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    /// Value of `Access-Control-Allow-Origin`.
    pub fn allow_origin(&self) -> &str {
        // Validated as visible ASCII at construction
        self.allow_origin.to_str().unwrap_or_default()
    }

    /// `Access-Control-Allow-Origin` as a header value.
    pub fn allow_origin_header(&self) -> &HeaderValue {
        &self.allow_origin
    }

    /// Timeout for the upstream session call.
    pub fn timeout(&self) -> Duration {
        self.upstream_timeout
    }
}

fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::new("remote_host is required"));
    }
    if host.contains("://") {
        return Err(ConfigError::new(
            "remote_host must not include a scheme; https is always used",
        ));
    }
    if host.contains('/') || host.chars().any(char::is_whitespace) {
        return Err(ConfigError::new(format!(
            "remote_host must be a bare host name, got {host:?}"
        )));
    }
    Ok(())
}

/// Parses an allowed origin, rejecting empty, wildcard and non-header values.
pub(crate) fn parse_origin(origin: &str) -> Result<HeaderValue, ConfigError> {
    if origin.is_empty() {
        return Err(ConfigError::new("allow_origin is required"));
    }
    if origin == "*" {
        return Err(ConfigError::new(
            "allow_origin cannot be a wildcard when credentials are allowed",
        ));
    }
    match HeaderValue::from_str(origin) {
        Ok(value) if value.to_str().is_ok() => Ok(value),
        _ => Err(ConfigError::new(format!(
            "allow_origin is not a valid header value: {origin:?}"
        ))),
    }
}
