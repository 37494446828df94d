//! # Tessera
//!
//! Binds HTTP request data into the fields of typed structs.
//!
//! Each field declares where its value comes from: a path segment, a query
//! parameter, a form field, a cookie, a header, or the request body in one
//! of several encodings. The first time a type is bound, its declarations
//! are compiled into a plan that is cached for the lifetime of the
//! [`Binder`]; every later request only fetches what the plan needs.
//!
//! ## Locations
//!
//! | Attribute | Location | Default lookup name |
//! |-----------|----------|---------------------|
//! | `path` | Router path parameters | field name |
//! | `query` | URL query string | field name |
//! | `form` | Urlencoded or multipart body | field name |
//! | `json` | JSON body (dotted path) | field name |
//! | `protobuf` | Protobuf body (bulk decode) | field name |
//! | `cookie` | `Cookie` header | field name |
//! | `header` | Any other header | field name with `_` as `-` |
//! | `raw_body` | The whole body | - |
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use tessera::{Bind, Binder, ErrorKind, Request};
//!
//! #[derive(Debug, Default, Bind)]
//! struct Auth {
//!     #[bind(header = "token", required)]
//!     token: String,
//! }
//!
//! #[derive(Debug, Default, Bind)]
//! struct UpdateUser {
//!     #[bind(path)]
//!     id: u64,
//!     #[bind(form = "display_name")]
//!     name: String,
//!     #[bind(nested, header = "x")]
//!     auth: Auth,
//! }
//!
//! let binder = Binder::new();
//! let mut request = Request::builder()
//!     .method(Method::PUT)
//!     .uri("/users/7")
//!     .path_param("id", "7")
//!     .header("x.token", "s3cret")
//!     .content_type("application/x-www-form-urlencoded")
//!     .body("display_name=Alice")
//!     .build();
//!
//! let mut update = UpdateUser::default();
//! binder.bind(&mut request, &mut update).unwrap();
//! assert_eq!(update.id, 7);
//! assert_eq!(update.name, "Alice");
//! assert_eq!(update.auth.token, "s3cret");
//!
//! // Binding stops at the first failing field.
//! let mut request = Request::builder().method(Method::GET).uri("/users/x").path_param("id", "x").build();
//! let err = binder.bind(&mut request, &mut UpdateUser::default()).unwrap_err();
//! assert_eq!(err.kind(), Some(ErrorKind::TypeMismatch));
//! assert_eq!(err.field(), Some("id"));
//! ```
//!
//! ## Error Handling
//!
//! Field failures carry an [`ErrorKind`] and the fully-qualified field name.
//! Whole-body decode failures are returned verbatim. [`BindError`] maps
//! both to HTTP status codes:
//!
//! ```rust
//! use tessera::{BindError, ErrorKind, FieldError};
//!
//! let err = BindError::from(FieldError::new(ErrorKind::UnsupportedContentType, "name"));
//! assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
//! ```

#![doc(html_root_url = "https://docs.rs/tessera/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate self as tessera;

mod binder;
mod binding;
mod body;
mod codec;
mod compile;
pub mod config;
mod cookie;
mod error;
mod form;
mod json;
mod location;
mod params;
mod plan;
mod request;
mod value;
mod values;

pub use binder::{bind, default_binder, Binder, Validator};
pub use binding::{
    declared_fields, Binding, DeclaredField, DirectiveDecl, FieldDescriptor, FieldWalker,
    ProtobufMessage,
};
pub use body::Body;
pub use codec::{BodyCodec, APPLICATION_FORM, APPLICATION_JSON, APPLICATION_PROTOBUF, MULTIPART_FORM};
pub use config::{BindConfig, ConfigError, ConfigLoader, DirectiveOrder};
pub use cookie::{find_cookie, parse_cookies, Cookie};
pub use error::{default_error_factory, BindError, ErrorFactory, ErrorKind, FieldError};
pub use form::{parse_form, DEFAULT_MAX_MEMORY};
pub use location::{Location, LocationSet};
pub use params::PathParams;
pub use plan::{Directive, FieldErrors, FieldPlan, Receiver};
pub use request::{Request, RequestBuilder};
pub use value::{convert, BindValue, ConvertError, RawValue};
pub use values::Values;

/// Derives [`Binding`] from `#[bind(...)]` field attributes.
pub use tessera_macros::Bind;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
