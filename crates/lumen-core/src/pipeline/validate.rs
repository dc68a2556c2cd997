//! Cheap checks on an input before it is handed to a decoder.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::TaskError;

/// Validates input files against the configured limits.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check that the file exists and is within the size limit. Blocking.
    pub fn check_file(&self, path: &Path) -> Result<u64, TaskError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TaskError::FileNotFound(path.to_path_buf()),
            _ => TaskError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read metadata: {}", e),
            },
        })?;

        if !metadata.is_file() {
            return Err(TaskError::Decode {
                path: path.to_path_buf(),
                message: "Not a regular file".to_string(),
            });
        }

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(TaskError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        Ok(metadata.len())
    }

    /// Reject buffers whose leading bytes match no known image signature.
    pub fn check_header(&self, bytes: &[u8], path: &Path) -> Result<(), TaskError> {
        if bytes.len() < 4 {
            return Err(TaskError::Decode {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }
        if !is_valid_image_header(&bytes[..bytes.len().min(12)]) {
            return Err(TaskError::Decode {
                path: path.to_path_buf(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }
        Ok(())
    }
}

/// Check if the header bytes match known image formats.
fn is_valid_image_header(header: &[u8]) -> bool {
    match header {
        // JPEG
        [0xFF, 0xD8, 0xFF, ..] => true,
        // PNG
        [0x89, b'P', b'N', b'G', ..] => true,
        // GIF
        [b'G', b'I', b'F', b'8', ..] => true,
        // WebP: RIFF....WEBP
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => true,
        [b'R', b'I', b'F', b'F', rest @ ..] => rest.len() < 8,
        // BMP
        [b'B', b'M', ..] => true,
        // TIFF, little- and big-endian, version 42
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => true,
        // PNM: P1..P7
        [b'P', b'1'..=b'7', ..] => true,
        // ISO-BMFF (AVIF/HEIF): ftyp box at offset 4
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => true,
        _ => false,
    }
}
