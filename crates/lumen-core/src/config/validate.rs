//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::operation::{OperationKind, OperationParams};
use crate::output::OutputFormat;
use crate::pipeline::sink::ImageFormatChoice;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    ///
    /// Operation parameters are only checked for operations whose table is
    /// complete; a missing key is reported when that operation is requested.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.operation_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "limits.operation_timeout_ms must be > 0 when set".into(),
            ));
        }
        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "output.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if ImageFormatChoice::from_extension(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format '{}' is not a supported image format",
                self.output.format
            )));
        }
        if OutputFormat::parse(&self.output.report_format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.report_format '{}' must be json or jsonl",
                self.output.report_format
            )));
        }
        for name in self.operations.names() {
            let kind: OperationKind = name.parse().map_err(|_| {
                ConfigError::ValidationError(format!("operations.{name} is not a known operation"))
            })?;
            let named = self.operations.params_for(kind);
            let complete = kind
                .parameter_names()
                .iter()
                .all(|key| named.contains_key(*key));
            if complete {
                OperationParams::from_named(kind, &named)
                    .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            }
        }
        Ok(())
    }
}
