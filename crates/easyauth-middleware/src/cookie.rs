//! Cookie header parsing and the platform session cookie.

use std::collections::HashMap;

use http::header::{HeaderMap, COOKIE};

/// Name of the platform's authentication session cookie.
///
/// Fixed by the hosting platform; not configurable.
pub const SESSION_COOKIE: &str = "AppServiceAuthSession";

/// Cookies parsed from every `Cookie` header of a request.
///
/// # Example
///
/// ```
/// use easyauth_middleware::cookie::Cookies;
/// use http::{header::COOKIE, HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(COOKIE, HeaderValue::from_static("theme=dark; AppServiceAuthSession=abc"));
///
/// let cookies = Cookies::from_headers(&headers);
/// assert_eq!(cookies.get("theme"), Some("dark"));
/// assert_eq!(cookies.session_token(), Some("abc"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: HashMap<String, String>,
}

impl Cookies {
    /// Parses all `Cookie` headers. Headers that are not valid visible ASCII
    /// are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();

        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let value = value.trim().trim_matches('"');
                    // First occurrence wins
                    cookies
                        .entry(name.trim().to_string())
                        .or_insert_with(|| value.to_string());
                }
            }
        }

        Self { cookies }
    }

    /// Get a cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns the platform session token, if present and non-empty.
    pub fn session_token(&self) -> Option<&str> {
        self.get(SESSION_COOKIE).filter(|token| !token.is_empty())
    }

    /// Get the number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Check if there are no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
