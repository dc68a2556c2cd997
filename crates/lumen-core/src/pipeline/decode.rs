//! Image decoding with format detection, validation, and timeout support.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::TaskError;
use crate::operation::raster::normalize;

use super::validate::Validator;

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// Decoded pixels, normalized to 8-bit gray or RGB
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Original file size in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read, validate and decode the file at `path`.
    ///
    /// File I/O and decoding run on the blocking pool under the configured
    /// decode deadline.
    pub async fn decode(&self, path: &Path) -> Result<DecodedImage, TaskError> {
        let path_owned = path.to_path_buf();
        let limits = self.limits.clone();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(
            timeout_duration,
            tokio::task::spawn_blocking(move || Self::decode_file_sync(&limits, &path_owned)),
        )
        .await;

        match decode_result {
            Ok(Ok(Ok(decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(TaskError::ImageTooLarge {
                        path: path.to_path_buf(),
                        width: decoded.width,
                        height: decoded.height,
                        max_dim: self.limits.max_image_dimension,
                    });
                }
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(TaskError::Panicked {
                path: path.to_path_buf(),
                message: format!("Decode worker failed: {}", e),
            }),
            Err(_) => Err(TaskError::Timeout {
                path: path.to_path_buf(),
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous read + decode (runs in spawn_blocking).
    fn decode_file_sync(limits: &LimitsConfig, path: &Path) -> Result<DecodedImage, TaskError> {
        let validator = Validator::new(limits.clone());
        validator.check_file(path)?;

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TaskError::FileNotFound(path.to_path_buf()),
            _ => TaskError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {}", e),
            },
        })?;
        validator.check_header(&bytes, path)?;

        Self::decode_bytes_sync(bytes, path)
    }

    /// Synchronous decode from bytes.
    fn decode_bytes_sync(bytes: Vec<u8>, path: &Path) -> Result<DecodedImage, TaskError> {
        use std::io::Cursor;

        let file_size = bytes.len() as u64;
        let cursor = Cursor::new(bytes);
        let reader = image::ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| TaskError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| TaskError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };
        let image = reader.decode().map_err(|e| TaskError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let image = normalize(image);
        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            file_size,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Pnm => "pnm".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}
