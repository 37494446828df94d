//! Request cookie parsing.

use http::{header, HeaderMap};

/// A single cookie sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    /// Creates a cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cookie value, with surrounding quotes removed.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Parses every `Cookie` header into a list, in the order sent.
///
/// Header values that are not valid UTF-8 and pairs without `=` are skipped.
///
/// # Example
///
/// ```rust
/// use http::{header, HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::COOKIE, HeaderValue::from_static("session=abc123; theme=dark"));
///
/// let cookies = tessera::parse_cookies(&headers);
/// assert_eq!(cookies.len(), 2);
/// assert_eq!(cookies[0].name(), "session");
/// assert_eq!(cookies[1].value(), "dark");
/// ```
#[must_use]
pub fn parse_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie::new(name, value.trim().trim_matches('"')))
        })
        .collect()
}

/// Returns the first cookie named `name`.
#[must_use]
pub fn find_cookie<'a>(cookies: &'a [Cookie], name: &str) -> Option<&'a Cookie> {
    cookies.iter().find(|cookie| cookie.name == name)
}
