//! Result sink: output directory, output naming, and atomic writes.
//!
//! Every task writes a distinct path, so the sink takes no locks. Each write
//! encodes fully in memory, lands in a hidden temporary sibling, and is then
//! renamed into place; a reader never observes a half-written file.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BatchError, TaskError, TaskResult};
use crate::operation::OperationKind;

/// How result files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// `operation` for a single input, `source` otherwise
    #[default]
    Auto,
    /// `<op>_image.<ext>`; only valid for a single input image
    Operation,
    /// `<stem>_<op>_image.<ext>`, stems disambiguated within the batch
    Source,
}

/// An encodable output format together with the extension used on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFormatChoice {
    format: ImageFormat,
    extension: String,
}

impl ImageFormatChoice {
    /// Resolve a writable format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let extension = ext.trim_start_matches('.').to_lowercase();
        let format = match extension.as_str() {
            "png" => ImageFormat::Png,
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "webp" => ImageFormat::WebP,
            "bmp" => ImageFormat::Bmp,
            "tif" | "tiff" => ImageFormat::Tiff,
            "pnm" | "ppm" | "pgm" => ImageFormat::Pnm,
            _ => return None,
        };
        Some(Self { format, extension })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl Default for ImageFormatChoice {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            extension: "png".to_string(),
        }
    }
}

/// Compute the per-source file name prefix for every input.
///
/// `None` means operation-scoped names. Source labels are file stems, with
/// repeats suffixed `-2`, `-3`, ... in input order.
pub fn source_labels(
    inputs: &[PathBuf],
    scheme: NamingScheme,
    output_dir: &Path,
    first_operation: OperationKind,
    format: &ImageFormatChoice,
) -> Result<Vec<Option<String>>, BatchError> {
    let scheme = match scheme {
        NamingScheme::Auto if inputs.len() <= 1 => NamingScheme::Operation,
        NamingScheme::Auto => NamingScheme::Source,
        explicit => explicit,
    };

    if scheme == NamingScheme::Operation {
        if inputs.len() > 1 {
            return Err(BatchError::OutputCollision {
                path: output_dir.join(file_name(None, first_operation, format)),
            });
        }
        return Ok(vec![None; inputs.len()]);
    }

    let mut taken = HashSet::new();
    let labels = inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "image".to_string());
            let mut label = stem.clone();
            let mut n = 2;
            while !taken.insert(label.clone()) {
                label = format!("{stem}-{n}");
                n += 1;
            }
            Some(label)
        })
        .collect();
    Ok(labels)
}

fn file_name(label: Option<&str>, kind: OperationKind, format: &ImageFormatChoice) -> String {
    match label {
        Some(label) => format!("{label}_{kind}_image.{}", format.extension()),
        None => format!("{kind}_image.{}", format.extension()),
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Owns the output directory and writes finished images into it.
#[derive(Debug)]
pub struct ResultSink {
    dir: PathBuf,
    format: ImageFormatChoice,
    jpeg_quality: u8,
}

impl ResultSink {
    /// Create the output directory if needed and return a sink for it.
    ///
    /// Safe to call concurrently or on an existing directory.
    pub fn prepare(
        dir: &Path,
        format: ImageFormatChoice,
        jpeg_quality: u8,
    ) -> Result<Self, BatchError> {
        let unusable = |message: String| BatchError::OutputDirectory {
            path: dir.to_path_buf(),
            message,
        };

        std::fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
        let meta = std::fs::metadata(dir).map_err(|e| unusable(e.to_string()))?;
        if !meta.is_dir() {
            return Err(unusable("not a directory".to_string()));
        }
        if meta.permissions().readonly() {
            return Err(unusable("directory is read-only".to_string()));
        }

        tracing::debug!("Output directory ready: {:?}", dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            format,
            jpeg_quality,
        })
    }

    /// Output path for one (source label, operation) pair.
    pub fn output_path(&self, label: Option<&str>, kind: OperationKind) -> PathBuf {
        self.dir.join(file_name(label, kind, &self.format))
    }

    /// Encode `image` and atomically place it at `path`. Blocking.
    pub fn write(&self, image: &DynamicImage, path: &Path) -> TaskResult<()> {
        let bytes = self.encode(image, path)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let temp = path.with_file_name(format!(
            ".{file_name}.tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let write_error = |source: std::io::Error| TaskError::Write {
            path: path.to_path_buf(),
            source,
        };

        std::fs::write(&temp, &bytes).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            write_error(e)
        })?;
        std::fs::rename(&temp, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            write_error(e)
        })?;

        tracing::trace!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn encode(&self, image: &DynamicImage, path: &Path) -> TaskResult<Vec<u8>> {
        let encode_error = |e: image::ImageError| TaskError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut buffer = Cursor::new(Vec::new());
        match self.format.format() {
            ImageFormat::Jpeg => {
                // JPEG has no alpha and no 16-bit
                let flattened = if image.color().has_color() {
                    DynamicImage::ImageRgb8(image.to_rgb8())
                } else {
                    DynamicImage::ImageLuma8(image.to_luma8())
                };
                let encoder = JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality);
                flattened
                    .write_with_encoder(encoder)
                    .map_err(encode_error)?;
            }
            format => image.write_to(&mut buffer, format).map_err(encode_error)?,
        }
        Ok(buffer.into_inner())
    }
}
