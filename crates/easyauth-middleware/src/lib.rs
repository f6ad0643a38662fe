//! # easyauth-middleware
//!
//! Gatekeeper middleware that lets a browser app running on `localhost`
//! use a deployed App Service site's cookie-based authentication endpoints
//! without cross-origin failures.
//!
//! ## Request Handling
//!
//! | Method    | Path        | Result                                            |
//! |-----------|-------------|---------------------------------------------------|
//! | `GET`     | `/.auth/*`  | `302` to `https://{host}/auth/*`                  |
//! | `GET`     | `/auth/*`   | platform `/.auth/*` JSON, or an error envelope    |
//! | `OPTIONS` | `/auth/*`   | `204` preflight                                   |
//! | other     | other       | next handler, untouched                           |
//!
//! ```text
//! Request → Gatekeeper ─┬─► redirect / proxy / preflight
//!                       └─► Handler (pass-through)
//!                                  ↓
//! Response ◄── Pipeline (renders BridgeError as JSON envelope)
//! ```
//!
//! ## Example
//!
//! ```
//! use easyauth_middleware::{GatekeeperConfig, Gatekeeper, Pipeline};
//!
//! let config = GatekeeperConfig::new("myapp.azurewebsites.net", 3000).unwrap();
//! let pipeline = Pipeline::builder()
//!     .add_stage(Gatekeeper::with_default_client(config).unwrap())
//!     .build();
//!
//! assert_eq!(pipeline.stage_names(), vec!["gatekeeper"]);
//! ```

#![doc(html_root_url = "https://docs.rs/easyauth-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod context;
pub mod cookie;
pub mod cors;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;
pub mod upstream;

// Re-export main types at crate root
pub use classify::Route;
pub use config::{ConfigError, GatekeeperConfig};
pub use context::MiddlewareContext;
pub use cookie::{Cookies, SESSION_COOKIE};
pub use cors::CorsPolicy;
pub use error::{BridgeError, BridgeResult};
pub use middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stages::Gatekeeper;
pub use types::{Request, Response, ResponseExt};
pub use upstream::{ReqwestUpstream, UpstreamClient, UpstreamResponse};
