//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the chain.
//! It is created by the host server for each request and dropped once the
//! response is written.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::classify::Route;

/// Context that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use easyauth_middleware::context::MiddlewareContext;
/// use easyauth_middleware::Route;
///
/// let mut ctx = MiddlewareContext::new();
/// assert!(ctx.route().is_none());
///
/// ctx.set_route(Route::Proxy);
/// assert_eq!(ctx.route(), Some(Route::Proxy));
/// ```
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// Unique identifier for this request.
    request_id: Uuid,

    /// Route chosen by the gatekeeper, if it ran.
    route: Option<Route>,

    /// When the request started processing.
    started_at: Instant,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh UUID v7 request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(Uuid::now_v7())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: Uuid) -> Self {
        Self {
            request_id,
            route: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the route chosen for this request.
    #[must_use]
    pub fn route(&self) -> Option<Route> {
        self.route
    }

    /// Records the route chosen for this request.
    pub fn set_route(&mut self, route: Route) {
        self.route = Some(route);
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
