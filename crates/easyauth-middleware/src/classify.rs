//! Request classification.
//!
//! Every inbound request is sorted into exactly one [`Route`] using only its
//! method and URI path. Prefix tests are literal and include the trailing
//! slash, so `/.auth` and `/authors` are never intercepted.
//!
//! | Method    | Path prefix | Route                   |
//! |-----------|-------------|-------------------------|
//! | `GET`     | `/.auth/`   | [`Route::Redirect`]     |
//! | `GET`     | `/auth/`    | [`Route::Proxy`]        |
//! | `OPTIONS` | `/auth/`    | [`Route::Preflight`]    |
//! | anything  | anything    | [`Route::PassThrough`]  |

use std::fmt;

use http::Method;

/// Path prefix the platform serves natively and the browser is bounced from.
pub const DOTTED_PREFIX: &str = "/.auth/";

/// Path prefix of the locally proxied session endpoints.
pub const PROXY_PREFIX: &str = "/auth/";

/// How the gatekeeper handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Hand the request to the next handler untouched.
    PassThrough,
    /// Send the browser to the remote `/auth/...` endpoint.
    Redirect,
    /// Fetch the remote `/.auth/...` endpoint with the session cookie.
    Proxy,
    /// Answer a CORS preflight for the proxied endpoints.
    Preflight,
}

impl Route {
    /// Classifies a request by method and path.
    pub fn classify(method: &Method, path: &str) -> Self {
        if method == Method::GET {
            if path.starts_with(DOTTED_PREFIX) {
                return Self::Redirect;
            }
            if path.starts_with(PROXY_PREFIX) {
                return Self::Proxy;
            }
        } else if method == Method::OPTIONS && path.starts_with(PROXY_PREFIX) {
            return Self::Preflight;
        }

        Self::PassThrough
    }

    /// Returns a stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::Redirect => "redirect",
            Self::Proxy => "proxy",
            Self::Preflight => "preflight",
        }
    }

    /// Returns `true` if the gatekeeper answers this route itself.
    pub fn is_intercepted(self) -> bool {
        !matches!(self, Self::PassThrough)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
