//! The packaged artifact produced by the builder

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A single packaged binary on disk.
///
/// `name` is the derived artifact name (e.g. `Product-2.3-beta`); `file_name`
/// is what the packager actually wrote, which may carry an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    name: String,
    file_name: String,
    path: PathBuf,
    size: u64,
}

impl Artifact {
    /// Describe an artifact file, reading its size from the filesystem
    pub fn from_path(name: impl Into<String>, path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("artifact path has no file name: {}", path.display()),
                )
            })?;

        Ok(Self {
            name: name.into(),
            file_name,
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes at the time the artifact was recorded
    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_records_size_and_file_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Product-1.0.exe");
        fs::write(&path, b"MZ\x90\x00binary").unwrap();

        let artifact = Artifact::from_path("Product-1.0", &path).unwrap();
        assert_eq!(artifact.name(), "Product-1.0");
        assert_eq!(artifact.file_name(), "Product-1.0.exe");
        assert_eq!(artifact.size(), 10);
    }

    #[test]
    fn test_from_path_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = Artifact::from_path("x", dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
