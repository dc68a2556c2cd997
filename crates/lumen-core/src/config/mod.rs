//! Configuration management for Lumen.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a partial file is fine.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Lumen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Default parameters per operation
    pub operations: OperationDefaults,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path (with ~ expansion).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let path = expand_path(path);
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.lumen.lumen/config.toml
    /// - Linux: ~/.config/lumen/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\lumen\config\config.toml
    ///
    /// Falls back to ~/.lumen/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "lumen", "lumen")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".lumen").join("config.toml")
            })
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Expand a leading `~` in a path.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OperationKind, ParamValue};
    use crate::pipeline::sink::NamingScheme;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.parallel_workers, 0);
        assert!(config.processing.image_workers() >= 1);
        assert_eq!(config.output.format, "png");
        assert_eq!(config.output.naming, NamingScheme::Auto);
        assert_eq!(config.limits.max_file_size_mb, 100);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("[operations.resize]"));
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let config = Config::default();
        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.operations, config.operations);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [processing]
            parallel_workers = 2

            [operations.resize]
            scale_x = 0.5
            scale_y = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.processing.image_workers(), 2);
        assert_eq!(
            config.operations.params_for(OperationKind::Resize)["scale_x"],
            ParamValue::Number(0.5)
        );
        // untouched operations keep their built-in parameters
        assert_eq!(
            config.operations.params_for(OperationKind::Rotate)["angle"],
            ParamValue::Number(45.0)
        );
        assert_eq!(config.output.format, "png");
    }

    #[test]
    fn test_operation_tables_accept_any_spelling() {
        let config = Config::from_toml(
            r#"
            [operations.Resize]
            scale_x = 0.5

            [operations.contrast-brightness]
            brightness = 10
            "#,
        )
        .unwrap();
        let resize = config.operations.params_for(OperationKind::Resize);
        assert_eq!(resize["scale_x"], ParamValue::Number(0.5));
        assert_eq!(resize["scale_y"], ParamValue::Number(2.0));
        assert_eq!(
            config.operations.params_for(OperationKind::ContrastBrightness)["brightness"],
            ParamValue::Number(10.0)
        );
        assert!(config.operations.names().all(|name| name == name.to_lowercase()));
    }

    #[test]
    fn test_integer_parameters_parse_as_numbers() {
        let config = Config::from_toml(
            r#"
            [operations.blur]
            kernel_size = 7
            "#,
        )
        .unwrap();
        assert_eq!(
            config.operations.params_for(OperationKind::Blur)["kernel_size"],
            ParamValue::Number(7.0)
        );
    }

    #[test]
    fn test_naming_parses_lowercase() {
        let config = Config::from_toml(
            r#"
            [output]
            naming = "source"
            "#,
        )
        .unwrap();
        assert_eq!(config.output.naming, NamingScheme::Source);
    }
}
