//! Operation parameters: the loose named form and the validated typed form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::OperationKind;
use crate::error::OperationError;

/// A single named parameter value, as written in config or on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Matrix(Vec<Vec<f64>>),
}

impl ParamValue {
    /// Parse a command-line value: a number, or a JSON-style matrix like `[[0,-1,0],[-1,5,-1],[0,-1,0]]`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<f64>() {
            return Some(Self::Number(n));
        }
        serde_json::from_str::<Vec<Vec<f64>>>(s)
            .ok()
            .map(Self::Matrix)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Matrix(rows) => {
                let rows: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                        format!("[{}]", cells.join(", "))
                    })
                    .collect();
                write!(f, "[{}]", rows.join(", "))
            }
        }
    }
}

/// Parameters keyed by name, before validation.
pub type NamedParams = BTreeMap<String, ParamValue>;

/// A rectangular convolution kernel stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Build a kernel from rows of weights. Rows must be non-empty, equally
    /// long, and finite.
    pub fn new(rows: &[Vec<f64>]) -> Result<Self, String> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err("kernel must have at least one row and one column".into());
        }
        if rows.iter().any(|row| row.len() != cols) {
            return Err("kernel rows must all have the same length".into());
        }
        if rows.iter().flatten().any(|w| !w.is_finite()) {
            return Err("kernel weights must be finite".into());
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            weights: rows.iter().flatten().map(|&w| w as f32).collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Weight at (row, col).
    pub fn weight(&self, row: usize, col: usize) -> f32 {
        self.weights[row * self.cols + col]
    }
}

/// Validated, typed parameters for one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationParams {
    Resize { scale_x: f64, scale_y: f64 },
    Rotate { angle: f64 },
    Blur { kernel_size: u32 },
    Canny { low_threshold: f64, high_threshold: f64 },
    ContrastBrightness { contrast: f64, brightness: f64 },
    HistogramEqualization,
    Filter { kernel: Kernel },
    Threshold { value: f64 },
    Erosion { kernel_size: u32, iterations: u32 },
    Dilation { kernel_size: u32, iterations: u32 },
}

impl OperationParams {
    /// Which operation these parameters belong to.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Resize { .. } => OperationKind::Resize,
            Self::Rotate { .. } => OperationKind::Rotate,
            Self::Blur { .. } => OperationKind::Blur,
            Self::Canny { .. } => OperationKind::Canny,
            Self::ContrastBrightness { .. } => OperationKind::ContrastBrightness,
            Self::HistogramEqualization => OperationKind::HistogramEqualization,
            Self::Filter { .. } => OperationKind::Filter,
            Self::Threshold { .. } => OperationKind::Threshold,
            Self::Erosion { .. } => OperationKind::Erosion,
            Self::Dilation { .. } => OperationKind::Dilation,
        }
    }

    /// Validate a named mapping against the schema of `kind`.
    ///
    /// Unknown keys, missing keys, wrongly shaped values and out-of-domain
    /// values all fail with `InvalidParameters`.
    pub fn from_named(kind: OperationKind, named: &NamedParams) -> Result<Self, OperationError> {
        let reader = Reader { kind, named };
        reader.reject_unknown()?;

        let params = match kind {
            OperationKind::Resize => {
                let scale_x = reader.number("scale_x")?;
                let scale_y = reader.number("scale_y")?;
                if scale_x <= 0.0 || scale_y <= 0.0 {
                    return Err(reader.invalid("scale factors must be > 0"));
                }
                Self::Resize { scale_x, scale_y }
            }
            OperationKind::Rotate => Self::Rotate {
                angle: reader.number("angle")?,
            },
            OperationKind::Blur => Self::Blur {
                kernel_size: reader.positive_int("kernel_size")?,
            },
            OperationKind::Canny => {
                let low_threshold = reader.number("low_threshold")?;
                let high_threshold = reader.number("high_threshold")?;
                if low_threshold < 0.0 || low_threshold > high_threshold {
                    return Err(reader.invalid("thresholds must satisfy 0 <= low <= high"));
                }
                Self::Canny {
                    low_threshold,
                    high_threshold,
                }
            }
            OperationKind::ContrastBrightness => Self::ContrastBrightness {
                contrast: reader.number("contrast")?,
                brightness: reader.number("brightness")?,
            },
            OperationKind::HistogramEqualization => Self::HistogramEqualization,
            OperationKind::Filter => {
                let rows = reader.matrix("kernel")?;
                let kernel = Kernel::new(rows).map_err(|msg| reader.invalid(&msg))?;
                Self::Filter { kernel }
            }
            OperationKind::Threshold => Self::Threshold {
                value: reader.number("value")?,
            },
            OperationKind::Erosion => Self::Erosion {
                kernel_size: reader.positive_int("kernel_size")?,
                iterations: reader.positive_int("iterations")?,
            },
            OperationKind::Dilation => Self::Dilation {
                kernel_size: reader.positive_int("kernel_size")?,
                iterations: reader.positive_int("iterations")?,
            },
        };
        Ok(params)
    }
}

/// Typed accessors over a [`NamedParams`] map for one operation.
struct Reader<'a> {
    kind: OperationKind,
    named: &'a NamedParams,
}

impl Reader<'_> {
    fn invalid(&self, message: &str) -> OperationError {
        OperationError::InvalidParameters {
            operation: self.kind,
            message: message.to_string(),
        }
    }

    fn reject_unknown(&self) -> Result<(), OperationError> {
        let allowed = self.kind.parameter_names();
        match self.named.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(self.invalid(&format!("unknown parameter '{key}'"))),
            None => Ok(()),
        }
    }

    fn number(&self, key: &str) -> Result<f64, OperationError> {
        match self.named.get(key) {
            Some(ParamValue::Number(n)) if n.is_finite() => Ok(*n),
            Some(ParamValue::Number(_)) => Err(self.invalid(&format!("'{key}' must be finite"))),
            Some(ParamValue::Matrix(_)) => {
                Err(self.invalid(&format!("'{key}' must be a number, not a matrix")))
            }
            None => Err(self.invalid(&format!("missing required parameter '{key}'"))),
        }
    }

    fn positive_int(&self, key: &str) -> Result<u32, OperationError> {
        let n = self.number(key)?;
        if n < 1.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return Err(self.invalid(&format!("'{key}' must be a whole number >= 1, got {n}")));
        }
        Ok(n as u32)
    }

    fn matrix(&self, key: &str) -> Result<&[Vec<f64>], OperationError> {
        match self.named.get(key) {
            Some(ParamValue::Matrix(rows)) => Ok(rows.as_slice()),
            Some(ParamValue::Number(_)) => {
                Err(self.invalid(&format!("'{key}' must be a matrix, not a number")))
            }
            None => Err(self.invalid(&format!("missing required parameter '{key}'"))),
        }
    }
}
