//! Error types for the dev server.
//!
//! These only occur while starting up. Once the server is accepting
//! connections, request failures are `BridgeError`s rendered by the
//! pipeline.

use easyauth_middleware::ConfigError;
use thiserror::Error;

/// Dev server errors.
#[derive(Debug, Error)]
pub enum DevServerError {
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Server startup error.
    #[error("Server error: {message}")]
    Server {
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DevServerError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Get the error category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::Json(_) | Self::Toml(_) => "config",
            Self::Server { .. } => "server",
            Self::Io(_) => "io",
        }
    }
}

impl From<ConfigError> for DevServerError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

/// Result type for dev server operations.
pub type DevServerResult<T> = Result<T, DevServerError>;
