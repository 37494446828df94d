//! Layered configuration loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use super::{BindConfig, ConfigError, DirectiveOrder};
use crate::Location;

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables (`PREFIX__KEY`)
///
/// # Example
///
/// ```no_run
/// use tessera::ConfigLoader;
///
/// # fn main() -> Result<(), tessera::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("bind.toml")?
///     .with_env_prefix("TESSERA")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: BindConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: BindConfig::default(),
            env_prefix: None,
        }
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = Self::parse(&content, &extension)?;

        tracing::debug!(path = %path.display(), "loaded binder configuration file");
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Recognized variables, with prefix `TESSERA`:
    /// - `TESSERA__MAX_FORM_MEMORY=1048576`
    /// - `TESSERA__LOOSE_ZERO_MODE=true`
    /// - `TESSERA__DEFAULT_BINDING=false`
    /// - `TESSERA__DIRECTIVE_ORDER=declaration`
    /// - `TESSERA__PRECEDENCE=header,cookie,path,query,form,json,protobuf`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply environment overrides and return the validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable cannot be parsed or
    /// validation fails.
    pub fn load(mut self) -> Result<BindConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> BindConfig {
        self.config
    }

    fn parse(content: &str, format: &str) -> Result<BindConfig, ConfigError> {
        match format {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let env_vars: HashMap<String, String> =
            env::vars().filter(|(k, _)| k.starts_with(prefix)).collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(name) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };

        match name {
            "MAX_FORM_MEMORY" => {
                self.config.max_form_memory = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "LOOSE_ZERO_MODE" => {
                self.config.loose_zero_mode = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "DEFAULT_BINDING" => {
                self.config.default_binding = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "DIRECTIVE_ORDER" => {
                self.config.directive_order = match value.to_lowercase().as_str() {
                    "precedence" => DirectiveOrder::Precedence,
                    "declaration" => DirectiveOrder::Declaration,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'precedence' or 'declaration'",
                        ))
                    }
                };
            }
            "PRECEDENCE" => {
                self.config.precedence = value
                    .split(',')
                    .map(|tag| {
                        Location::from_tag(tag.trim().to_lowercase().as_str()).ok_or_else(|| {
                            ConfigError::env_parse_error(key, format!("unknown location '{tag}'"))
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
            // Unknown keys are ignored.
            _ => {}
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, BindConfig::default());
    }

    #[test]
    fn test_loader_with_string_toml() {
        let toml = r#"
            max_form_memory = 1024
            precedence = ["header", "cookie", "path", "query", "form", "json", "protobuf"]
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.max_form_memory, 1024);
        assert_eq!(config.precedence[0], Location::Header);
        assert!(config.default_binding);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"default_binding": false}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(!config.default_binding);
    }

    #[test]
    fn test_loader_unknown_format() {
        let result = ConfigLoader::new().with_string("", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "loose_zero_mode = true").unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();
        assert!(config.loose_zero_mode);
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/bind.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/bind.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, BindConfig::default());
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("max_form_memory = 0", "toml")
            .unwrap()
            .load();
        assert!(result.is_err());

        let config = ConfigLoader::new()
            .with_string("max_form_memory = 0", "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.max_form_memory, 0);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("On"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_apply_env_var_scalars() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__MAX_FORM_MEMORY", "2048", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__LOOSE_ZERO_MODE", "yes", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__DIRECTIVE_ORDER", "Declaration", "TEST")
            .unwrap();

        assert_eq!(loader.config.max_form_memory, 2048);
        assert!(loader.config.loose_zero_mode);
        assert_eq!(loader.config.directive_order, DirectiveOrder::Declaration);
    }

    #[test]
    fn test_apply_env_var_precedence() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var(
                "TEST__PRECEDENCE",
                "header, cookie,path,query,form,json,protobuf",
                "TEST",
            )
            .unwrap();
        assert_eq!(loader.config.precedence[1], Location::Cookie);

        let result = loader.apply_env_var("TEST__PRECEDENCE", "path,body", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_apply_env_var_invalid() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__MAX_FORM_MEMORY", "lots", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__DEFAULT_BINDING", "maybe", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__UNKNOWN", "x", "TEST")
            .is_ok());
    }
}
