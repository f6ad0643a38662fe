//! Gatekeeper middleware.
//!
//! Lets a browser app served from `localhost` read the platform's
//! authentication state without tripping cross-origin rules. It works as a
//! two-hop protocol:
//!
//! ```text
//! browser ── GET /.auth/me ──► local ── 302 ──► https://{host}/auth/me
//!                                                   │  (deployed copy of this
//!                                                   │   server, same middleware)
//!                              https://{host}/.auth/me ◄── GET + session cookie
//! ```
//!
//! 1. `GET /.auth/*` locally is redirected to the deployed site's `/auth/*`,
//!    where the browser already holds the `AppServiceAuthSession` cookie.
//! 2. `GET /auth/*` reads that cookie and fetches the platform's native
//!    `/.auth/*` endpoint server-side, returning the JSON with credentialed
//!    CORS headers for the local origin.
//! 3. `OPTIONS /auth/*` answers the browser's preflight.
//!
//! Anything else is passed to the next handler untouched.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, LOCATION};
use serde::de::IgnoredAny;
use http::StatusCode;
use tracing::{debug, info};

use crate::classify::Route;
use crate::config::GatekeeperConfig;
use crate::context::MiddlewareContext;
use crate::cookie::Cookies;
use crate::cors::CorsPolicy;
use crate::error::{BridgeError, BridgeResult};
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
use crate::types::{Request, Response, ResponseExt};
use crate::upstream::{session_headers, ReqwestUpstream, UpstreamClient, UpstreamResponse};

/// Middleware that redirects, proxies or preflights the `/.auth/` and
/// `/auth/` endpoints.
#[derive(Clone)]
pub struct Gatekeeper {
    config: Arc<GatekeeperConfig>,
    cors: CorsPolicy,
    upstream: Arc<dyn UpstreamClient>,
}

impl Gatekeeper {
    /// Creates a gatekeeper with an injected upstream client.
    pub fn new(config: GatekeeperConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        let cors = CorsPolicy::from_config(&config);
        Self {
            config: Arc::new(config),
            cors,
            upstream,
        }
    }

    /// Creates a gatekeeper backed by a `reqwest` client using the
    /// configured timeout.
    pub fn with_default_client(config: GatekeeperConfig) -> BridgeResult<Self> {
        let upstream = ReqwestUpstream::from_config(&config)?;
        Ok(Self::new(config, Arc::new(upstream)))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Redirect target for a dotted path: `/.auth/me` → `https://{host}/auth/me`.
    pub fn redirect_location(&self, path_and_query: &str) -> String {
        let undotted = path_and_query.strip_prefix("/.").unwrap_or(path_and_query);
        let undotted = undotted.trim_start_matches('/');
        format!("https://{}/{}", self.config.remote_host(), undotted)
    }

    /// Upstream URL for a proxied path: `/auth/me` → `https://{host}/.auth/me`.
    pub fn upstream_url(&self, path_and_query: &str) -> String {
        let rest = path_and_query.strip_prefix('/').unwrap_or(path_and_query);
        format!("https://{}/.{}", self.config.remote_host(), rest)
    }

    fn redirect(&self, path_and_query: &str) -> BridgeResult<Response> {
        let location = self.redirect_location(path_and_query);
        let location = HeaderValue::from_str(&location)
            .map_err(|e| BridgeError::internal(format!("invalid redirect location: {e}")))?;

        debug!(location = ?location, "redirecting to deployed site");

        let mut response = Response::empty(StatusCode::FOUND);
        response.headers_mut().insert(LOCATION, location);
        self.cors.apply(response.headers_mut());
        Ok(response)
    }

    async fn proxy(&self, request: &Request) -> BridgeResult<Response> {
        let cookies = Cookies::from_headers(request.headers());
        let token = cookies.session_token().ok_or(BridgeError::MissingSession)?;

        let url = self.upstream_url(path_and_query(request));
        let headers = session_headers(token)?;

        debug!(url = %url, "fetching session from platform");
        let upstream = self.upstream.get(&url, headers).await?;

        let outcome = upstream_outcome(&upstream);
        metrics::counter!("easyauth_upstream_responses_total", "outcome" => outcome).increment(1);
        info!(
            upstream_status = upstream.status.as_u16(),
            outcome,
            "platform session endpoint answered"
        );

        let body = interpret(upstream)?;
        let mut response = Response::json(StatusCode::OK, body);
        self.cors.apply(response.headers_mut());
        Ok(response)
    }
}

impl Middleware for Gatekeeper {
    fn name(&self) -> &'static str {
        "gatekeeper"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let route = Route::classify(request.method(), request.uri().path());
            ctx.set_route(route);
            metrics::counter!("easyauth_requests_total", "route" => route.as_str()).increment(1);

            match route {
                Route::PassThrough => next.run(ctx, request).await,
                Route::Redirect => self.redirect(path_and_query(&request)),
                Route::Proxy => self.proxy(&request).await,
                Route::Preflight => Ok(self.cors.preflight_response()),
            }
        })
    }
}

fn path_and_query(request: &Request) -> &str {
    request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path(), |pq| pq.as_str())
}

fn upstream_outcome(response: &UpstreamResponse) -> &'static str {
    if response.is_success() {
        "success"
    } else if response.status == StatusCode::FOUND {
        "login_required"
    } else {
        "error"
    }
}

/// Turns a platform response into the JSON body to return, or an error.
///
/// Only `302` means "log in first"; other redirects are passed through as
/// ordinary upstream errors. A successful body is checked to be JSON and
/// returned byte for byte.
fn interpret(response: UpstreamResponse) -> BridgeResult<Bytes> {
    if response.status == StatusCode::FOUND {
        return Err(BridgeError::LoginRequired);
    }
    if !response.is_success() {
        return Err(BridgeError::upstream(
            response.status.as_u16(),
            response.failure_message(),
        ));
    }

    serde_json::from_slice::<IgnoredAny>(&response.body).map_err(|e| {
        BridgeError::upstream(
            StatusCode::BAD_GATEWAY.as_u16(),
            format!("platform returned invalid JSON: {e}"),
        )
    })?;
    Ok(response.body)
}
