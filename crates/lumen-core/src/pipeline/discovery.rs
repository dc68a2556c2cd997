//! Expansion of command-line inputs into a list of image files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Discovers image files in directories.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Expand inputs into image paths, preserving order and dropping repeats.
    ///
    /// Directories are walked recursively for supported extensions, sorted by
    /// path. Anything else is kept as given, even if it does not exist, so the
    /// failure is reported against that input.
    pub fn expand(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for input in inputs {
            let found = if input.is_dir() {
                self.discover(input)
            } else {
                vec![input.clone()]
            };
            for path in found {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }
        files
    }

    /// Recursively find all supported files under a directory.
    pub fn discover(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported(e.path()))
            .map(|e| e.into_path())
            .collect();

        // Sort by path for deterministic ordering
        files.sort();
        files
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(discovery.is_supported(Path::new("test.tiff")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("noext")));
    }

    #[test]
    fn test_expand_walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.png", "a.jpg", "nested/c.bmp", "readme.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.expand(&[dir.path().to_path_buf()]);
        assert_eq!(
            files,
            vec![
                dir.path().join("a.jpg"),
                dir.path().join("b.png"),
                dir.path().join("nested/c.bmp"),
            ]
        );
    }

    #[test]
    fn test_expand_keeps_missing_files_and_drops_repeats() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let missing = PathBuf::from("/no/such/photo.png");
        let files = discovery.expand(&[missing.clone(), missing.clone()]);
        assert_eq!(files, vec![missing]);
    }
}
