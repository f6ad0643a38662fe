//! Middleware pipeline.
//!
//! The pipeline runs a fixed list of stages in front of a terminal handler
//! and is the one place where errors become responses. Every stage and the
//! handler return `Result<Response, BridgeError>`; an `Err` reaching the top
//! of the chain is logged and rendered as the standard JSON error envelope.
//! Error responses and responses to intercepted routes carry an
//! `x-request-id` header. Pass-through responses leave the pipeline exactly
//! as the handler produced them.

use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use tracing::{error, warn};

use crate::classify::Route;
use crate::context::MiddlewareContext;
use crate::error::BridgeError;
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
use crate::types::{Request, Response};

/// Header carrying the request ID.
pub static HEADER_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Ordered middleware stages in front of a terminal handler.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::builder()
///     .add_stage(Gatekeeper::new(config, client))
///     .build();
///
/// let response = pipeline
///     .process(MiddlewareContext::new(), request, |_ctx, req| {
///         Box::pin(async move { forward_to_backend(req).await })
///     })
///     .await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through every stage and then the handler.
    ///
    /// Never fails: errors are converted to error responses here.
    pub async fn process<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + 'static,
    {
        let next = self.build_chain(handler);
        let mut response = match next.run(&mut ctx, request).await {
            Ok(response) if !ctx.route().is_some_and(Route::is_intercepted) => {
                return response;
            }
            Ok(response) => response,
            Err(err) => report_error(&ctx, &err),
        };

        if let Ok(value) = HeaderValue::from_str(&ctx.request_id().to_string()) {
            response.headers_mut().insert(HEADER_REQUEST_ID.clone(), value);
        }

        response
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Logs an error and renders it as the JSON error envelope.
fn report_error(ctx: &MiddlewareContext, err: &BridgeError) -> Response {
    let status = err.status_code();
    let route = ctx.route().map_or("none", |r| r.as_str());

    if status >= 500 {
        error!(
            request_id = %ctx.request_id(),
            route,
            status,
            code = err.code(),
            error = %err,
            "request failed"
        );
    } else {
        warn!(
            request_id = %ctx.request_id(),
            route,
            status,
            code = err.code(),
            error = %err,
            "request rejected"
        );
    }

    err.to_response(ctx.request_id())
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware stage. Stages run in insertion order.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware stage.
    #[must_use]
    pub fn add_shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::{BodyExt, Full};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl Middleware for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_stage_names() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .add_stage(Counting { calls })
            .build();

        assert_eq!(pipeline.stage_names(), vec!["counting"]);
        assert_eq!(pipeline.stage_count(), 1);
    }

    struct Routing(Route);

    impl Middleware for Routing {
        fn name(&self) -> &'static str {
            "routing"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, MiddlewareResult> {
            ctx.set_route(self.0);
            Box::pin(next.run(ctx, request))
        }
    }

    fn ok_handler(
        _ctx: &mut MiddlewareContext,
        _req: Request,
    ) -> BoxFuture<'static, MiddlewareResult> {
        Box::pin(async {
            let mut response = Response::empty(StatusCode::OK);
            response
                .headers_mut()
                .insert("x-app", HeaderValue::from_static("1"));
            Ok(response)
        })
    }

    #[tokio::test]
    async fn test_process_runs_stages_and_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .add_stage(Counting {
                calls: calls.clone(),
            })
            .add_stage(Counting {
                calls: calls.clone(),
            })
            .build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(response.headers().get(&HEADER_REQUEST_ID).is_none());
    }

    #[tokio::test]
    async fn test_pass_through_headers_are_untouched() {
        let pipeline = Pipeline::builder()
            .add_stage(Routing(Route::PassThrough))
            .build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), ok_handler)
            .await;
        let alone = ok_handler(&mut MiddlewareContext::new(), request())
            .await
            .unwrap();

        assert_eq!(response.headers(), alone.headers());
    }

    #[tokio::test]
    async fn test_intercepted_route_gets_request_id() {
        let pipeline = Pipeline::builder()
            .add_stage(Routing(Route::Redirect))
            .build();

        let ctx = MiddlewareContext::new();
        let request_id = ctx.request_id();
        let response = pipeline.process(ctx, request(), ok_handler).await;

        assert_eq!(
            response.headers().get(&HEADER_REQUEST_ID).unwrap(),
            request_id.to_string().as_str()
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_rendered() {
        let pipeline = Pipeline::builder().build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async { Err(BridgeError::backend("connection refused")) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(&HEADER_REQUEST_ID).is_some());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "BACKEND_ERROR");
    }
}
