//! The request view the binder reads from.
//!
//! [`Request`] carries the parts of an HTTP request that binding needs plus
//! two request-scoped caches: the buffered body (see [`Body::duplicate`]) and
//! the parsed form. Both are filled on first use and reused afterwards.

use bytes::Bytes;
use http::{header, HeaderMap, Method, Uri};
use std::io;

use crate::cookie::{parse_cookies, Cookie};
use crate::form::parse_form;
use crate::{BindError, Body, PathParams, Values};

/// An HTTP request prepared for binding.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use tessera::{PathParams, Request};
///
/// let mut params = PathParams::new();
/// params.push("id", "123");
///
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/users/123?verbose=true")
///     .header("x-request-id", "abc")
///     .path_params(params)
///     .build();
///
/// assert_eq!(request.path_params().get("id"), Some("123"));
/// assert_eq!(request.query().unwrap().get("verbose"), Some("true"));
/// assert_eq!(request.header("x-request-id"), Some("abc"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
    path_params: PathParams,
    post_form: Option<Values>,
}

impl Request {
    /// Creates a request.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: impl Into<Body>,
        path_params: PathParams,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
            path_params,
            post_form: None,
        }
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns a mutable reference to the body.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Consumes the request and returns the body.
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Returns the router-supplied path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns a mutable reference to path parameters.
    pub fn path_params_mut(&mut self) -> &mut PathParams {
        &mut self.path_params
    }

    /// Returns true for methods that conventionally carry a body.
    #[must_use]
    pub fn has_body_method(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// Buffers the body and returns its bytes.
    ///
    /// Returns `None` without touching the body for methods that do not
    /// carry one. The body stays readable afterwards.
    pub fn buffer_body(&mut self) -> io::Result<Option<Bytes>> {
        if !self.has_body_method() {
            return Ok(None);
        }
        self.body.duplicate().map(Some)
    }

    /// Buffers the body like [`buffer_body`](Request::buffer_body), reading
    /// no more than `limit` bytes from the stream.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::PayloadTooLarge`] when the body is longer than
    /// `limit`, or [`BindError::Body`] when reading fails.
    pub fn buffer_body_within(&mut self, limit: usize) -> Result<Option<Bytes>, BindError> {
        if !self.has_body_method() {
            return Ok(None);
        }
        match self.body.duplicate_within(limit)? {
            Some(bytes) => Ok(Some(bytes)),
            None => Err(BindError::PayloadTooLarge { limit }),
        }
    }

    /// Parses the query string.
    pub fn query(&self) -> Result<Values, BindError> {
        match self.uri.query() {
            Some(query) => Ok(Values::from_urlencoded(query)?),
            None => Ok(Values::new()),
        }
    }

    /// Parses the `Cookie` headers.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie> {
        parse_cookies(&self.headers)
    }

    /// Parses the body as a form and caches the result on the request.
    ///
    /// Later calls are free. Requests whose method carries no body parse to
    /// an empty form.
    pub fn parse_post_form(&mut self, max_memory: usize) -> Result<&Values, BindError> {
        if self.post_form.is_none() {
            let values = match self.buffer_body_within(max_memory)? {
                Some(bytes) => parse_form(self.content_type(), &bytes, max_memory)?,
                None => Values::new(),
            };
            self.post_form = Some(values);
        }
        Ok(self.post_form.get_or_insert_with(Values::new))
    }

    /// Returns the cached form, if it has been parsed.
    #[must_use]
    pub fn post_form(&self) -> Option<&Values> {
        self.post_form.as_ref()
    }
}

/// Converts an `http::Request`, taking [`PathParams`] from its extensions
/// when a router stored them there.
impl<B: Into<Body>> From<http::Request<B>> for Request {
    fn from(request: http::Request<B>) -> Self {
        let (mut parts, body) = request.into_parts();
        let path_params = parts.extensions.remove::<PathParams>().unwrap_or_default();
        Self::new(parts.method, parts.uri, parts.headers, body, path_params)
    }
}

/// Builder for constructing a [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Body,
    path_params: PathParams,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI; an unparsable URI is ignored.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = Some(uri);
        }
        self
    }

    /// Appends a header; invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<header::HeaderName>(),
            value.parse::<header::HeaderValue>(),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the `Content-Type` header.
    #[must_use]
    pub fn content_type(self, value: &str) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), value)
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn path_params(mut self, path_params: PathParams) -> Self {
        self.path_params = path_params;
        self
    }

    /// Adds one path parameter.
    #[must_use]
    pub fn path_param(mut self, name: &str, value: &str) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Builds the request. Defaults to `GET /`.
    #[must_use]
    pub fn build(self) -> Request {
        Request::new(
            self.method.unwrap_or(Method::GET),
            self.uri.unwrap_or_else(|| Uri::from_static("/")),
            self.headers,
            self.body,
            self.path_params,
        )
    }
}
