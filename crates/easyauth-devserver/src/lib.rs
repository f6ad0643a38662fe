//! easyauth dev server
//!
//! Serves a browser app on `localhost` with the easyauth gatekeeper in
//! front of it, so the app can call `/.auth/*` and `/auth/*` exactly as it
//! would when deployed.
//!
//! ```text
//! browser ──► dev server ──► Gatekeeper ─┬─► redirect / proxy / preflight
//!                                        └─► local backend (or 404)
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! # Run with a configuration file
//! $ easyauth-devserver --config easyauth.toml
//!
//! # Run with environment variables
//! $ EASYAUTH_REMOTE_HOST=myapp.azurewebsites.net \
//!   EASYAUTH_BACKEND_URL=http://localhost:5173 \
//!   easyauth-devserver
//! ```

#![doc(html_root_url = "https://docs.rs/easyauth-devserver/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use backend::BackendClient;
pub use config::{DevServerConfig, DevServerConfigBuilder};
pub use error::{DevServerError, DevServerResult};
pub use logging::init_logging;
pub use server::DevServer;

/// Dev server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
