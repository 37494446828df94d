//! Content-type negotiation for request bodies.

use crate::Location;

/// Media type for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";
/// Media type for protobuf bodies.
pub const APPLICATION_PROTOBUF: &str = "application/x-protobuf";
/// Media type for urlencoded form bodies.
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
/// Media type for multipart form bodies.
pub const MULTIPART_FORM: &str = "multipart/form-data";

/// Wire format of a request body, derived from its `Content-Type`.
///
/// The codec is a property of the request, independent of which locations
/// the target structure declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BodyCodec {
    /// Absent or unrecognized content type
    #[default]
    Unsupported,
    /// Urlencoded or multipart form
    Form,
    /// JSON document
    Json,
    /// Protobuf message
    Protobuf,
}

impl BodyCodec {
    /// Maps a `Content-Type` header value to a body codec.
    ///
    /// Parameters (everything from the first `;`) are dropped and trailing
    /// spaces trimmed from the media type, which must then match exactly.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tessera::BodyCodec;
    ///
    /// assert_eq!(BodyCodec::negotiate(Some("application/json; charset=utf-8")), BodyCodec::Json);
    /// assert_eq!(BodyCodec::negotiate(Some("text/plain")), BodyCodec::Unsupported);
    /// assert_eq!(BodyCodec::negotiate(None), BodyCodec::Unsupported);
    /// ```
    #[must_use]
    pub fn negotiate(content_type: Option<&str>) -> Self {
        match content_type.map(media_type) {
            Some(APPLICATION_JSON) => Self::Json,
            Some(APPLICATION_PROTOBUF) => Self::Protobuf,
            Some(APPLICATION_FORM | MULTIPART_FORM) => Self::Form,
            _ => Self::Unsupported,
        }
    }

    /// The body location this codec serves, if any.
    #[must_use]
    pub const fn location(self) -> Option<Location> {
        match self {
            Self::Unsupported => None,
            Self::Form => Some(Location::Form),
            Self::Json => Some(Location::Json),
            Self::Protobuf => Some(Location::Protobuf),
        }
    }

    /// Returns true if a directive for `location` can be served by this codec.
    #[must_use]
    pub fn serves(self, location: Location) -> bool {
        self.location() == Some(location)
    }
}

/// Strips parameters from a `Content-Type` value.
pub(crate) fn media_type(content_type: &str) -> &str {
    match content_type.find(';') {
        Some(idx) => content_type[..idx].trim_end_matches(' '),
        None => content_type,
    }
}
