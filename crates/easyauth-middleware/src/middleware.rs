//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every stage implements.
//! A stage either answers a request itself or hands it on through [`Next`].
//! Failures are returned as `Err(BridgeError)` and rendered by the pipeline,
//! never written to the response by the stage that raised them.
//!
//! # Example
//!
//! ```ignore
//! use easyauth_middleware::{BoxFuture, Middleware, MiddlewareResult, Next, Request};
//! use easyauth_middleware::context::MiddlewareContext;
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, MiddlewareResult> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "stage finished");
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::MiddlewareContext;
use crate::error::BridgeResult;
use crate::types::{Request, Response};

/// A boxed future that returns `T`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a middleware stage or terminal handler.
pub type MiddlewareResult = BridgeResult<Response>;

/// The core middleware trait.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once
/// - A stage that does not call `next.run()` owns the response
/// - A stage that passes a request on must not modify it
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this middleware stage.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult>;
}

/// Terminal handler invoked after the last middleware stage.
pub type Handler<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a>;

/// Callback to invoke the next middleware in the chain.
///
/// Consumed on use, so it can only be run once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Handler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> MiddlewareResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;

    struct Tagging {
        name: &'static str,
    }

    impl Middleware for Tagging {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async move {
                let mut response = next.run(ctx, request).await?;
                response
                    .headers_mut()
                    .append("x-visited", self.name.parse().unwrap());
                Ok(response)
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::empty(StatusCode::OK)) }));

        let response = next.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_order() {
        let first = Tagging { name: "first" };
        let second = Tagging { name: "second" };
        let mut ctx = MiddlewareContext::new();

        let handler = Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::empty(StatusCode::OK)) }));
        let next = Next::new(&first, Next::new(&second, handler));

        let response = next.run(&mut ctx, request()).await.unwrap();
        let visited: Vec<_> = response
            .headers()
            .get_all("x-visited")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(visited, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_errors_propagate_through_chain() {
        let stage = Tagging { name: "outer" };
        let mut ctx = MiddlewareContext::new();

        let handler = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(BridgeError::backend("connection refused")) })
        });
        let result = Next::new(&stage, handler).run(&mut ctx, request()).await;

        assert_eq!(result.unwrap_err(), BridgeError::backend("connection refused"));
    }
}
