//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::operation::{NamedParams, OperationKind, ParamValue};
use crate::pipeline::sink::NamingScheme;

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Images processed at once (0 = available parallelism)
    pub parallel_workers: usize,

    /// Operations running at once across the whole batch (0 = available parallelism)
    pub operation_workers: usize,

    /// Extensions picked up when an input is a directory
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 0,
            operation_workers: 0,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
                "gif".to_string(),
            ],
        }
    }
}

impl ProcessingConfig {
    /// Image-level pool size with 0 resolved to the hardware parallelism.
    pub fn image_workers(&self) -> usize {
        resolve_workers(self.parallel_workers)
    }

    /// Operation-level pool size with 0 resolved to the hardware parallelism.
    pub fn operation_workers(&self) -> usize {
        resolve_workers(self.operation_workers)
    }
}

fn resolve_workers(configured: usize) -> usize {
    if configured > 0 {
        configured
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Per-operation deadline in milliseconds (unset = no deadline)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_timeout_ms: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
            decode_timeout_ms: 10000,
            operation_timeout_ms: None,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Image format for results, by extension ("png", "jpg", "webp", ...)
    pub format: String,

    /// How output files are named
    pub naming: NamingScheme,

    /// Quality for JPEG results (1-100)
    pub jpeg_quality: u8,

    /// Run report format ("json" or "jsonl")
    pub report_format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            naming: NamingScheme::Auto,
            jpeg_quality: 90,
            report_format: "json".to_string(),
            pretty: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Default parameters per operation, keyed by operation name.
///
/// Values from a config file are layered key by key over the built-in
/// defaults:
///
/// ```toml
/// [operations.resize]
/// scale_x = 0.5
/// scale_y = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OperationDefaults(BTreeMap<String, NamedParams>);

impl OperationDefaults {
    /// An empty table, with no defaults for any operation.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Parameters configured for `kind` (empty if none).
    pub fn params_for(&self, kind: OperationKind) -> NamedParams {
        self.0.get(kind.name()).cloned().unwrap_or_default()
    }

    /// Set or replace one parameter of one operation.
    pub fn set(&mut self, kind: OperationKind, key: &str, value: ParamValue) {
        self.0
            .entry(kind.name().to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Canonical operation names present in the table.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for OperationDefaults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = BTreeMap::<String, NamedParams>::deserialize(deserializer)?;
        let mut merged = Self::default();
        for (name, params) in overrides {
            let kind: OperationKind = name.parse().map_err(|_| {
                serde::de::Error::custom(format!("operations.{name} is not a known operation"))
            })?;
            merged
                .0
                .entry(kind.name().to_string())
                .or_default()
                .extend(params);
        }
        Ok(merged)
    }
}

impl Default for OperationDefaults {
    fn default() -> Self {
        use ParamValue::{Matrix, Number};

        let mut defaults = Self::empty();
        defaults.set(OperationKind::Resize, "scale_x", Number(2.0));
        defaults.set(OperationKind::Resize, "scale_y", Number(2.0));
        defaults.set(OperationKind::Rotate, "angle", Number(45.0));
        defaults.set(OperationKind::Blur, "kernel_size", Number(5.0));
        defaults.set(OperationKind::Canny, "low_threshold", Number(100.0));
        defaults.set(OperationKind::Canny, "high_threshold", Number(200.0));
        defaults.set(OperationKind::ContrastBrightness, "contrast", Number(1.5));
        defaults.set(OperationKind::ContrastBrightness, "brightness", Number(50.0));
        defaults.set(
            OperationKind::Filter,
            "kernel",
            Matrix(vec![
                vec![1.0, 1.0, 1.0],
                vec![1.0, -8.0, 1.0],
                vec![1.0, 1.0, 1.0],
            ]),
        );
        defaults.set(OperationKind::Threshold, "value", Number(128.0));
        for kind in [OperationKind::Erosion, OperationKind::Dilation] {
            defaults.set(kind, "kernel_size", Number(3.0));
            defaults.set(kind, "iterations", Number(1.0));
        }
        defaults
    }
}
