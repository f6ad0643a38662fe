//! Error types for the gatekeeper and its host chain.
//!
//! Every failure is a single [`BridgeError`] value carrying an HTTP status
//! and a message. Middleware never writes error responses itself; errors
//! travel up the chain as `Err` and are rendered once by
//! [`Pipeline`](crate::pipeline::Pipeline) using [`BridgeError::to_response`].
//!
//! # Error Envelope Format
//!
//! ```json
//! {
//!   "error": {
//!     "code": "LOGIN_REQUIRED",
//!     "message": "Human-readable error message",
//!     "request_id": "uuid-v7-request-id"
//!   }
//! }
//! ```

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Response, ResponseExt};

/// Message returned when the platform answers the session endpoint with a
/// login redirect.
pub const LOGIN_REQUIRED_MESSAGE: &str = "The deployed site redirected to its login page. \
     Sign in to the deployed site in this browser first, then reload the local app.";

/// Errors raised while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The `AppServiceAuthSession` cookie was absent or empty.
    #[error("missing AppServiceAuthSession cookie; sign in to the deployed site first")]
    MissingSession,

    /// The platform answered with a redirect to its interactive login.
    #[error("{}", LOGIN_REQUIRED_MESSAGE)]
    LoginRequired,

    /// The platform answered with a non-success status.
    #[error("{message}")]
    Upstream {
        /// Status returned by the platform.
        status: u16,
        /// Message taken from the platform's response.
        message: String,
    },

    /// No response was received from the platform.
    #[error("upstream unreachable: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// The pass-through backend could not be reached.
    #[error("backend error: {message}")]
    Backend {
        /// Error message.
        message: String,
    },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl BridgeError {
    /// Create an upstream error with the platform's status and message.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    #[allow(clippy::match_same_arms)]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingSession => 400,
            Self::LoginRequired => 401,
            Self::Upstream { status, .. } => *status,
            Self::Network { .. } => 500,
            Self::Backend { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }

    /// Get the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSession => "MISSING_SESSION",
            Self::LoginRequired => "LOGIN_REQUIRED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Renders this error as a JSON envelope response.
    ///
    /// Statuses outside the valid range fall back to 502.
    pub fn to_response(&self, request_id: Uuid) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                request_id: request_id.to_string(),
            },
        };
        let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{}".to_vec());

        Response::json(status, body)
    }
}

/// Result type for middleware operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    request_id: String,
}
