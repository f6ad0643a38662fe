//! Dev server HTTP implementation.
//!
//! Every request runs through the gatekeeper pipeline. Requests the
//! gatekeeper passes through go to the configured backend, or get a 404
//! when there is none.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use easyauth_middleware::{
    BoxFuture, Gatekeeper, MiddlewareContext, MiddlewareResult, Pipeline, Request, Response,
    ResponseExt, UpstreamClient,
};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Instrument};

use crate::backend::BackendClient;
use crate::config::DevServerConfig;
use crate::error::{DevServerError, DevServerResult};

/// Dev server.
pub struct DevServer {
    config: Arc<DevServerConfig>,
    pipeline: Arc<Pipeline>,
    backend: Option<Arc<BackendClient>>,
}

impl DevServer {
    /// Create a dev server that calls the real platform.
    pub fn new(config: DevServerConfig) -> DevServerResult<Self> {
        let gatekeeper = Gatekeeper::with_default_client(config.to_gatekeeper_config()?)
            .map_err(|e| DevServerError::server(format!("failed to create gatekeeper: {e}")))?;
        Self::with_gatekeeper(config, gatekeeper)
    }

    /// Create a dev server whose gatekeeper uses the given upstream client.
    pub fn with_upstream(
        config: DevServerConfig,
        upstream: Arc<dyn UpstreamClient>,
    ) -> DevServerResult<Self> {
        let gatekeeper = Gatekeeper::new(config.to_gatekeeper_config()?, upstream);
        Self::with_gatekeeper(config, gatekeeper)
    }

    fn with_gatekeeper(config: DevServerConfig, gatekeeper: Gatekeeper) -> DevServerResult<Self> {
        let backend = match &config.server.backend_url {
            Some(url) => Some(Arc::new(BackendClient::new(
                url.clone(),
                config.server.backend_timeout,
            )?)),
            None => None,
        };
        let pipeline = Pipeline::builder().add_stage(gatekeeper).build();

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            backend,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DevServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn run(self) -> DevServerResult<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .listen_addr
                .parse()
                .map_err(|e| DevServerError::config(format!("invalid listen address: {e}")))?,
            self.config.server.listen_port,
        );

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DevServerError::server(format!("failed to bind {addr}: {e}")))?;

        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> DevServerResult<()> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "easyauth dev server listening");
        info!(
            remote_host = %self.config.gatekeeper.remote_host,
            backend = self.backend.as_ref().map_or("none", |b| b.base_url()),
            "gatekeeper ready"
        );

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let pipeline = self.pipeline.clone();
            let backend = self.backend.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req| {
                    let pipeline = pipeline.clone();
                    let backend = backend.clone();
                    async move {
                        Ok::<_, Infallible>(handle_request(req, pipeline, backend, peer_addr).await)
                    }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(error = %e, "connection error");
                }
            });
        }
    }
}

/// Handle an incoming request.
async fn handle_request(
    req: http::Request<Incoming>,
    pipeline: Arc<Pipeline>,
    backend: Option<Arc<BackendClient>>,
    peer_addr: SocketAddr,
) -> Response {
    let ctx = MiddlewareContext::new();
    let request_id = ctx.request_id();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        peer = %peer_addr,
    );

    async move {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                Bytes::new()
            }
        };
        let request = Request::from_parts(parts, Full::new(body));

        let started_at = ctx.started_at();
        let response = pipeline
            .process(ctx, request, move |ctx, req| terminal(ctx, req, backend))
            .await;

        info!(
            status = response.status().as_u16(),
            duration_ms = started_at.elapsed().as_millis(),
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

/// Terminal handler for pass-through requests.
fn terminal(
    ctx: &mut MiddlewareContext,
    req: Request,
    backend: Option<Arc<BackendClient>>,
) -> BoxFuture<'static, MiddlewareResult> {
    let request_id = ctx.request_id();
    Box::pin(async move {
        match backend {
            Some(backend) => backend.forward(req).await,
            None => Ok(not_found(req.uri().path(), &request_id.to_string())),
        }
    })
}

#[derive(Serialize)]
struct NotFound<'a> {
    error: NotFoundBody<'a>,
}

#[derive(Serialize)]
struct NotFoundBody<'a> {
    code: &'static str,
    message: String,
    request_id: &'a str,
}

/// Response for pass-through requests when no backend is configured.
fn not_found(path: &str, request_id: &str) -> Response {
    let envelope = NotFound {
        error: NotFoundBody {
            code: "NOT_FOUND",
            message: format!("no backend configured for {path}"),
            request_id,
        },
    };
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{}".to_vec());
    Response::json(StatusCode::NOT_FOUND, body)
}
