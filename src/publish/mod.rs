//! Release publisher
//!
//! Creates the public release record with its three attached files. The
//! hosting platform's one-release-per-tag constraint is the only duplicate
//! guard; nothing here re-implements it.

mod gh;

pub use gh::GhCliHost;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Number of files attached to every release
pub const RELEASE_FILE_COUNT: usize = 3;

/// Publish errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("invalid release: {0}")]
    InvalidSpec(String),

    #[error("a release for tag '{tag}' already exists")]
    AlreadyExists { tag: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("release host rejected the request: {0}")]
    Rejected(String),
}

/// The artifact, checksum manifest and attestation, in upload order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReleaseFiles(Vec<PathBuf>);

impl ReleaseFiles {
    /// Exactly [`RELEASE_FILE_COUNT`] files, each of which must exist
    pub fn new(files: Vec<PathBuf>) -> Result<Self, PublishError> {
        if files.len() != RELEASE_FILE_COUNT {
            return Err(PublishError::InvalidSpec(format!(
                "expected {} files, got {}",
                RELEASE_FILE_COUNT,
                files.len()
            )));
        }
        if let Some(missing) = files.iter().find(|f| !f.is_file()) {
            return Err(PublishError::InvalidSpec(format!(
                "attachment {} does not exist",
                missing.display()
            )));
        }
        Ok(Self(files))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

/// Release record to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseSpec {
    tag: String,
    title: String,
    body: String,
    draft: bool,
    prerelease: bool,
    files: ReleaseFiles,
}

impl ReleaseSpec {
    pub fn new(
        tag: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        prerelease: bool,
        files: ReleaseFiles,
    ) -> Self {
        Self {
            tag: tag.into(),
            title: title.into(),
            body: body.into(),
            draft: false,
            prerelease,
            files,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Always false; releases are published immediately
    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease
    }

    pub fn files(&self) -> &[PathBuf] {
        self.files.paths()
    }

    /// Attachment file names, in upload order
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .paths()
            .iter()
            .map(|f| file_name(f))
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Release as created by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRelease {
    pub tag: String,
    /// Permanent URL assigned by the host
    pub url: String,
    pub prerelease: bool,
    pub files: Vec<String>,
}

/// Capability: create a release record
pub trait ReleaseHost {
    fn create_release(&self, spec: &ReleaseSpec) -> Result<PublishedRelease, PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn files(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| {
                let path = dir.path().join(n);
                fs::write(&path, n.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_spec_accepts_three_files() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["Product-1.0.exe", "checksums.txt", "build-attestation.json"]);

        let files = ReleaseFiles::new(files).unwrap();
        let spec = ReleaseSpec::new("v1.0", "Release 1.0", "notes", false, files);
        assert!(!spec.is_draft());
        assert!(!spec.is_prerelease());
        assert_eq!(
            spec.file_names(),
            vec!["Product-1.0.exe", "checksums.txt", "build-attestation.json"]
        );
    }

    #[test]
    fn test_files_reject_wrong_count() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["Product-1.0.exe", "checksums.txt"]);

        let err = ReleaseFiles::new(files).unwrap_err();
        assert!(err.to_string().contains("expected 3 files"));
    }

    #[test]
    fn test_files_reject_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut files = files(&dir, &["Product-1.0.exe", "checksums.txt"]);
        files.push(dir.path().join("build-attestation.json"));

        let err = ReleaseFiles::new(files).unwrap_err();
        assert!(matches!(err, PublishError::InvalidSpec(_)));
    }
}
