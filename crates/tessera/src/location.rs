//! Request locations a field can be bound from.
//!
//! The set of locations is closed, so membership sets are stored as a
//! bitset ([`LocationSet`]) and per-location tables as fixed-size arrays
//! indexed by [`Location::index`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A place in the HTTP request a field value can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Router-supplied path parameters (e.g., `/users/{id}`)
    Path,
    /// Urlencoded or multipart form body
    Form,
    /// URL query string
    Query,
    /// `Cookie` request header
    Cookie,
    /// Any other request header
    Header,
    /// Protobuf-encoded request body
    Protobuf,
    /// JSON request body
    Json,
    /// The whole raw body
    RawBody,
}

impl Location {
    /// Number of locations; sizes per-location arrays.
    pub const COUNT: usize = 8;

    /// Every location, in index order.
    pub const ALL: [Location; Self::COUNT] = [
        Self::Path,
        Self::Form,
        Self::Query,
        Self::Cookie,
        Self::Header,
        Self::Protobuf,
        Self::Json,
        Self::RawBody,
    ];

    /// Locations eligible for ordinary field directives.
    ///
    /// Raw body is excluded: it captures the whole body rather than a named value.
    pub const DEFAULTS: [Location; Self::COUNT - 1] = [
        Self::Path,
        Self::Form,
        Self::Query,
        Self::Cookie,
        Self::Header,
        Self::Protobuf,
        Self::Json,
    ];

    /// Position of this location in per-location arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The attribute key used to declare a directive for this location.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Form => "form",
            Self::Query => "query",
            Self::Cookie => "cookie",
            Self::Header => "header",
            Self::Protobuf => "protobuf",
            Self::Json => "json",
            Self::RawBody => "raw_body",
        }
    }

    /// Looks a location up by its attribute key.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|location| location.tag() == tag)
    }

    /// Returns true for locations served from the request body.
    #[must_use]
    pub const fn is_body(self) -> bool {
        matches!(self, Self::Form | Self::Protobuf | Self::Json | Self::RawBody)
    }

    /// Lookup name used when a field declares no override for this location.
    ///
    /// Headers use the hyphenated form of the declared name (`request_id`
    /// becomes `request-id`); every other location uses the name verbatim.
    #[must_use]
    pub fn default_name(self, declared: &str) -> String {
        match self {
            Self::Header => declared.replace('_', "-"),
            _ => declared.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A set of [`Location`]s stored as a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LocationSet(u16);

impl LocationSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns a copy of this set with `location` added.
    #[must_use]
    pub const fn with(self, location: Location) -> Self {
        Self(self.0 | (1 << location.index()))
    }

    /// Adds a location.
    pub fn insert(&mut self, location: Location) {
        self.0 |= 1 << location.index();
    }

    /// Removes a location.
    pub fn remove(&mut self, location: Location) {
        self.0 &= !(1 << location.index());
    }

    /// Returns true if the set contains `location`.
    #[must_use]
    pub const fn contains(self, location: Location) -> bool {
        self.0 & (1 << location.index()) != 0
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of locations in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the members in index order.
    pub fn iter(self) -> impl Iterator<Item = Location> {
        Location::ALL
            .into_iter()
            .filter(move |location| self.contains(*location))
    }
}

impl FromIterator<Location> for LocationSet {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        let mut set = Self::new();
        for location in iter {
            set.insert(location);
        }
        set
    }
}
