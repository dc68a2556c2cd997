//! The closed set of image operations and the registry that dispatches them.
//!
//! - **params**: named parameters from config/CLI and their typed, validated form
//! - **raster**: interleaved 8-bit buffer used by the pixel kernels
//! - **geometry**: resize and rotate
//! - **filters**: box blur, explicit-kernel convolution, Canny edges
//! - **tone**: contrast/brightness, histogram equalization, thresholding
//! - **morphology**: erosion and dilation

mod filters;
mod geometry;
mod morphology;
pub mod params;
pub(crate) mod raster;
mod tone;

pub use params::{Kernel, NamedParams, OperationParams, ParamValue};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OperationError;

/// A named transformation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Resize,
    Rotate,
    Blur,
    Canny,
    ContrastBrightness,
    HistogramEqualization,
    Filter,
    Threshold,
    Erosion,
    Dilation,
}

impl OperationKind {
    /// Every operation, in declaration order.
    pub const ALL: [OperationKind; 10] = [
        Self::Resize,
        Self::Rotate,
        Self::Blur,
        Self::Canny,
        Self::ContrastBrightness,
        Self::HistogramEqualization,
        Self::Filter,
        Self::Threshold,
        Self::Erosion,
        Self::Dilation,
    ];

    /// Lowercase name used in file names, config keys and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Rotate => "rotate",
            Self::Blur => "blur",
            Self::Canny => "canny",
            Self::ContrastBrightness => "contrast_brightness",
            Self::HistogramEqualization => "histogram_equalization",
            Self::Filter => "filter",
            Self::Threshold => "threshold",
            Self::Erosion => "erosion",
            Self::Dilation => "dilation",
        }
    }

    /// Parameter names this operation requires.
    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            Self::Resize => &["scale_x", "scale_y"],
            Self::Rotate => &["angle"],
            Self::Blur => &["kernel_size"],
            Self::Canny => &["low_threshold", "high_threshold"],
            Self::ContrastBrightness => &["contrast", "brightness"],
            Self::HistogramEqualization => &[],
            Self::Filter => &["kernel"],
            Self::Threshold => &["value"],
            Self::Erosion | Self::Dilation => &["kernel_size", "iterations"],
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = OperationError;

    /// Case-insensitive lookup by name. Dashes are accepted for underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| OperationError::Unsupported {
                name: s.to_string(),
            })
    }
}

/// Stateless lookup and dispatch table over [`OperationKind`].
///
/// Constructed once and passed to whoever needs to run operations; it holds
/// no configuration and performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationRegistry;

impl OperationRegistry {
    pub fn new() -> Self {
        Self
    }

    /// All registered operation kinds.
    pub fn kinds(&self) -> &'static [OperationKind] {
        &OperationKind::ALL
    }

    /// Resolve an operation name, failing with `Unsupported` for unknown names.
    pub fn lookup(&self, name: &str) -> Result<OperationKind, OperationError> {
        name.parse()
    }

    /// Build validated parameters for `kind` from a named mapping.
    ///
    /// All parameter checks happen here, before any pixel work.
    pub fn resolve(
        &self,
        kind: OperationKind,
        named: &NamedParams,
    ) -> Result<OperationParams, OperationError> {
        OperationParams::from_named(kind, named)
    }

    /// Apply an operation to an image, returning a new image.
    ///
    /// The source is never modified.
    pub fn apply(
        &self,
        params: &OperationParams,
        image: &DynamicImage,
    ) -> Result<DynamicImage, OperationError> {
        match params {
            OperationParams::Resize { scale_x, scale_y } => {
                geometry::resize(image, *scale_x, *scale_y)
            }
            OperationParams::Rotate { angle } => geometry::rotate(image, *angle),
            OperationParams::Blur { kernel_size } => filters::box_blur(image, *kernel_size),
            OperationParams::Canny {
                low_threshold,
                high_threshold,
            } => filters::canny(image, *low_threshold, *high_threshold),
            OperationParams::ContrastBrightness {
                contrast,
                brightness,
            } => tone::contrast_brightness(image, *contrast, *brightness),
            OperationParams::HistogramEqualization => tone::equalize_histogram(image),
            OperationParams::Filter { kernel } => filters::convolve(image, kernel),
            OperationParams::Threshold { value } => tone::threshold(image, *value),
            OperationParams::Erosion {
                kernel_size,
                iterations,
            } => morphology::erode(image, *kernel_size, *iterations),
            OperationParams::Dilation {
                kernel_size,
                iterations,
            } => morphology::dilate(image, *kernel_size, *iterations),
        }
    }
}
