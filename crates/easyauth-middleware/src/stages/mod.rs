//! Middleware stages.
//!
//! - [`gatekeeper`] - Redirect, proxy and preflight the `/.auth/` and
//!   `/auth/` endpoints

pub mod gatekeeper;

pub use gatekeeper::Gatekeeper;
