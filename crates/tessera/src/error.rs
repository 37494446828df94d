//! Binding error types.
//!
//! Field-level failures are [`FieldError`]s: an [`ErrorKind`] plus the
//! fully-qualified name of the field. They are built once per directive when
//! a plan is compiled, through an [`ErrorFactory`], and only cloned at
//! request time. Whole-body decode failures are carried verbatim in
//! [`BindError`].

use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The four ways a single field can fail to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field has no value at any of its declared locations
    MissingRequired,
    /// A value was found but does not convert to the field type
    TypeMismatch,
    /// The field type cannot accept values from this location
    CannotBind,
    /// A body-bound field does not match the request's content type
    UnsupportedContentType,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 4] = [
        Self::MissingRequired,
        Self::TypeMismatch,
        Self::CannotBind,
        Self::UnsupportedContentType,
    ];

    /// Default human-readable cause.
    #[must_use]
    pub const fn cause(self) -> &'static str {
        match self {
            Self::MissingRequired => "missing required parameter",
            Self::TypeMismatch => "parameter type does not match binding data",
            Self::CannotBind => "parameter cannot be bound",
            Self::UnsupportedContentType => "does not support binding to the content type body",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cause())
    }
}

/// A failure attributed to one field.
///
/// # Example
///
/// ```rust
/// use tessera::{ErrorKind, FieldError};
///
/// let err = FieldError::new(ErrorKind::MissingRequired, "user.id");
/// assert_eq!(err.kind(), ErrorKind::MissingRequired);
/// assert_eq!(err.field(), "user.id");
/// assert!(err.to_string().contains("user.id"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
    kind: ErrorKind,
    field: Arc<str>,
    message: Arc<str>,
}

impl FieldError {
    /// Creates an error with the default message.
    #[must_use]
    pub fn new(kind: ErrorKind, field: &str) -> Self {
        Self::with_message(
            kind,
            field,
            format!("binding: expr_path={field}, cause={}", kind.cause()),
        )
    }

    /// Creates an error with a custom message.
    #[must_use]
    pub fn with_message(kind: ErrorKind, field: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: Arc::from(field),
            message: Arc::from(message.into()),
        }
    }

    /// The failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Fully-qualified name of the failing field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The formatted message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Builds the error value for a field name and failure kind.
///
/// Installed on a [`Binder`](crate::Binder); message formatting is left to
/// the factory so applications can localize or restyle it.
pub type ErrorFactory = Arc<dyn Fn(ErrorKind, &str) -> FieldError + Send + Sync>;

/// The factory used when none is configured.
#[must_use]
pub fn default_error_factory() -> ErrorFactory {
    Arc::new(FieldError::new)
}

/// Error returned when a request cannot be bound.
#[derive(Debug, Error)]
pub enum BindError {
    /// A single field failed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The JSON body could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The protobuf body could not be decoded.
    #[error(transparent)]
    Protobuf(#[from] prost::DecodeError),

    /// A protobuf body was sent to a type without protobuf support.
    #[error("protobuf content type is not supported by {type_name}")]
    ProtobufUnsupported {
        /// Name of the destination type.
        type_name: &'static str,
    },

    /// The query string or urlencoded form is malformed.
    #[error("malformed urlencoded data: {0}")]
    Urlencoded(#[from] serde_urlencoded::de::Error),

    /// The multipart form is malformed.
    #[error("malformed multipart form: {0}")]
    Multipart(#[from] multer::Error),

    /// The form body exceeds the configured in-memory bound.
    #[error("payload too large: body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit.
        limit: usize,
    },

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    Body(#[from] std::io::Error),

    /// The installed validator rejected the bound value.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl BindError {
    /// The field failure kind, if this error belongs to the field taxonomy.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Field(err) => Some(err.kind()),
            Self::ProtobufUnsupported { .. } => Some(ErrorKind::UnsupportedContentType),
            _ => None,
        }
    }

    /// The failing field's fully-qualified name, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Field(err) => Some(err.field()),
            _ => None,
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Field(err) => match err.kind() {
                ErrorKind::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::ProtobufUnsupported { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Json(_)
            | Self::Protobuf(_)
            | Self::Urlencoded(_)
            | Self::Multipart(_)
            | Self::Body(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Field(err) => match err.kind() {
                ErrorKind::MissingRequired => "MISSING_PARAMETER",
                ErrorKind::TypeMismatch => "INVALID_PARAMETER",
                ErrorKind::CannotBind => "UNBINDABLE_PARAMETER",
                ErrorKind::UnsupportedContentType => "UNSUPPORTED_MEDIA_TYPE",
            },
            Self::ProtobufUnsupported { .. } => "UNSUPPORTED_MEDIA_TYPE",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Json(_) | Self::Protobuf(_) | Self::Urlencoded(_) | Self::Multipart(_) => {
                "DESERIALIZATION_FAILED"
            }
            Self::Body(_) => "BODY_READ_FAILED",
        }
    }
}
