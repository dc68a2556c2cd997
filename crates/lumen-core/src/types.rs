//! Core data types describing the outcome of a batch run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{OperationError, TaskError};
use crate::operation::OperationKind;

/// Category of a per-image or per-task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decode,
    InvalidParameters,
    UnsupportedOperation,
    Encode,
    Write,
    Timeout,
    Cancelled,
    Panicked,
}

/// Structured failure recorded in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&TaskError> for FailureRecord {
    fn from(err: &TaskError) -> Self {
        let kind = match err {
            TaskError::Decode { .. }
            | TaskError::FileNotFound(_)
            | TaskError::FileTooLarge { .. }
            | TaskError::ImageTooLarge { .. }
            | TaskError::UnsupportedFormat { .. } => ErrorKind::Decode,
            TaskError::Operation(OperationError::Unsupported { .. }) => {
                ErrorKind::UnsupportedOperation
            }
            TaskError::Operation(_) => ErrorKind::InvalidParameters,
            TaskError::Encode { .. } => ErrorKind::Encode,
            TaskError::Write { .. } => ErrorKind::Write,
            TaskError::Timeout { .. } => ErrorKind::Timeout,
            TaskError::Cancelled(_) => ErrorKind::Cancelled,
            TaskError::Panicked { .. } => ErrorKind::Panicked,
        };
        Self::new(kind, err.to_string())
    }
}

/// What happened to one input image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// The image decoded; each requested operation either wrote its output
    /// or recorded a failure.
    Processed {
        succeeded: BTreeMap<OperationKind, PathBuf>,
        failed: BTreeMap<OperationKind, FailureRecord>,
    },
    /// Nothing ran for this image (decode failure or cancellation).
    Failed(FailureRecord),
}

/// Per-image result of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    /// Input path as given
    pub source: PathBuf,

    /// Decoded dimensions, when decoding succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,

    pub outcome: ImageOutcome,

    /// Wall-clock time spent on this image in milliseconds
    pub elapsed_ms: u64,
}

impl ImageReport {
    /// A report for an image where nothing ran.
    pub fn failed(source: &Path, failure: FailureRecord, elapsed_ms: u64) -> Self {
        Self {
            source: source.to_path_buf(),
            dimensions: None,
            outcome: ImageOutcome::Failed(failure),
            elapsed_ms,
        }
    }

    /// Operations that produced an output file.
    pub fn succeeded(&self) -> impl Iterator<Item = (&OperationKind, &PathBuf)> {
        let map = match &self.outcome {
            ImageOutcome::Processed { succeeded, .. } => Some(succeeded),
            ImageOutcome::Failed(_) => None,
        };
        map.into_iter().flatten()
    }

    /// Operations that were recorded as failed.
    pub fn failed_operations(&self) -> impl Iterator<Item = (&OperationKind, &FailureRecord)> {
        let map = match &self.outcome {
            ImageOutcome::Processed { failed, .. } => Some(failed),
            ImageOutcome::Failed(_) => None,
        };
        map.into_iter().flatten()
    }

    /// The image-level failure, if nothing ran.
    pub fn image_failure(&self) -> Option<&FailureRecord> {
        match &self.outcome {
            ImageOutcome::Failed(failure) => Some(failure),
            ImageOutcome::Processed { .. } => None,
        }
    }

    /// True when the image decoded and every operation succeeded.
    pub fn is_complete_success(&self) -> bool {
        matches!(&self.outcome, ImageOutcome::Processed { failed, .. } if failed.is_empty())
    }
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub images_total: usize,
    /// Images where at least one operation wrote output
    pub images_processed: usize,
    /// Images where nothing ran
    pub images_failed: usize,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub elapsed_ms: u64,
}

/// Result of a whole batch: exactly one report per distinct input path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub images: BTreeMap<PathBuf, ImageReport>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Assemble a report and compute its stats.
    pub fn new(reports: impl IntoIterator<Item = ImageReport>, elapsed_ms: u64) -> Self {
        let images: BTreeMap<PathBuf, ImageReport> = reports
            .into_iter()
            .map(|report| (report.source.clone(), report))
            .collect();

        let mut stats = BatchStats {
            images_total: images.len(),
            elapsed_ms,
            ..Default::default()
        };
        for report in images.values() {
            let ok = report.succeeded().count();
            stats.tasks_succeeded += ok;
            stats.tasks_failed += report.failed_operations().count();
            if report.image_failure().is_some() {
                stats.images_failed += 1;
            } else if ok > 0 {
                stats.images_processed += 1;
            }
        }

        Self { images, stats }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&ImageReport> {
        self.images.get(path)
    }

    /// True when any image or task failed.
    pub fn has_failures(&self) -> bool {
        self.stats.images_failed > 0 || self.stats.tasks_failed > 0
    }
}
