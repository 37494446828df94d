//! Binder configuration.
//!
//! [`BindConfig`] controls the request-independent policies of a
//! [`Binder`](crate::Binder): the form memory bound, loose zero conversion,
//! default binding of untagged fields and the order in which a field's
//! directives are tried. [`ConfigLoader`] layers defaults, a TOML or JSON
//! file and `PREFIX__KEY` environment variables.
//!
//! # Example
//!
//! ```
//! use tessera::{BindConfig, ConfigLoader, DirectiveOrder};
//!
//! let config = ConfigLoader::new()
//!     .with_string("loose_zero_mode = true\ndirective_order = \"declaration\"", "toml")
//!     .unwrap()
//!     .load()
//!     .unwrap();
//!
//! assert!(config.loose_zero_mode);
//! assert_eq!(config.directive_order, DirectiveOrder::Declaration);
//! assert_eq!(config.max_form_memory, BindConfig::default().max_form_memory);
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use crate::form::DEFAULT_MAX_MEMORY;
use crate::Location;
use serde::{Deserialize, Serialize};

/// How the directives declared on one field are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveOrder {
    /// Sort by [`BindConfig::precedence`]; raw body always last.
    #[default]
    Precedence,
    /// Keep the order the directives were declared in.
    Declaration,
}

/// Binder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BindConfig {
    /// Upper bound in bytes for in-memory form and multipart parsing.
    pub max_form_memory: usize,

    /// Convert empty text values to the field type's zero value.
    pub loose_zero_mode: bool,

    /// Bind fields without directives from every default location.
    pub default_binding: bool,

    /// Directive ordering policy.
    pub directive_order: DirectiveOrder,

    /// Location precedence, highest first.
    pub precedence: Vec<Location>,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            max_form_memory: DEFAULT_MAX_MEMORY,
            loose_zero_mode: false,
            default_binding: true,
            directive_order: DirectiveOrder::Precedence,
            precedence: Self::DEFAULT_PRECEDENCE.to_vec(),
        }
    }
}

impl BindConfig {
    /// Default location precedence.
    pub const DEFAULT_PRECEDENCE: [Location; Location::COUNT - 1] = [
        Location::Path,
        Location::Query,
        Location::Form,
        Location::Json,
        Location::Protobuf,
        Location::Cookie,
        Location::Header,
    ];

    /// Locations in precedence order.
    #[must_use]
    pub fn precedence(&self) -> &[Location] {
        &self.precedence
    }

    /// Sort key of `location`; unlisted locations (raw body) sort last.
    #[must_use]
    pub fn rank(&self, location: Location) -> usize {
        self.precedence
            .iter()
            .position(|&l| l == location)
            .unwrap_or(Location::COUNT)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero memory bound or a
    /// precedence list that is not a permutation of the default locations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_form_memory == 0 {
            return Err(ConfigError::invalid_value(
                "max_form_memory",
                "must be greater than zero",
            ));
        }

        let mut sorted = self.precedence.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != self.precedence.len() || sorted != Location::DEFAULTS {
            return Err(ConfigError::invalid_value(
                "precedence",
                format!(
                    "must list each of {} exactly once",
                    Location::DEFAULTS.map(Location::tag).join(", ")
                ),
            ));
        }

        Ok(())
    }
}
