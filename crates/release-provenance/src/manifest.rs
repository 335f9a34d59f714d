//! Checksum manifest (checksums.txt)
//!
//! Fixed text format:
//!
//! ```text
//! # <header comment block>
//!
//! SHA256: <hex>
//! MD5: <hex>
//!
//! # <verification instructions>
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::fingerprint::DigestPair;
use crate::MANIFEST_TIME_FORMAT;

/// Default published file name for the checksum manifest
pub const CHECKSUM_FILE_NAME: &str = "checksums.txt";

/// Build identifiers interpolated into the manifest header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestContext {
    pub generated_at: DateTime<Utc>,
    pub workflow: String,
    pub run_id: String,
    pub commit: String,
}

/// Rendered checksum manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumManifest {
    text: String,
}

/// Digest lines read back from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChecksums {
    pub sha256: Option<String>,
    pub md5: Option<String>,
}

impl ChecksumManifest {
    /// Render the manifest for `file_name`
    pub fn render(file_name: &str, context: &ManifestContext, digests: &DigestPair) -> Self {
        let mut text = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(text, "# Checksums for {}", file_name);
        let _ = writeln!(
            text,
            "# Generated: {}",
            context.generated_at.format(MANIFEST_TIME_FORMAT)
        );
        let _ = writeln!(text, "# Workflow: {}", context.workflow);
        let _ = writeln!(text, "# Run ID: {}", context.run_id);
        let _ = writeln!(text, "# Commit: {}", context.commit);
        text.push('\n');
        let _ = writeln!(text, "SHA256: {}", digests.sha256());
        let _ = writeln!(text, "MD5: {}", digests.md5());
        text.push('\n');
        let _ = writeln!(text, "# Verify on Windows (PowerShell):");
        let _ = writeln!(text, "#   Get-FileHash -Algorithm SHA256 .\\{}", file_name);
        let _ = writeln!(text, "#   Get-FileHash -Algorithm MD5 .\\{}", file_name);
        let _ = writeln!(text, "# Verify on Linux/macOS:");
        let _ = writeln!(text, "#   sha256sum {}", file_name);
        let _ = writeln!(text, "#   md5sum {}", file_name);

        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.text)
    }

    /// Extract the `SHA256:` and `MD5:` lines from manifest text.
    ///
    /// Comment lines are ignored. Digests are lowercased.
    pub fn parse(text: &str) -> ParsedChecksums {
        let mut parsed = ParsedChecksums {
            sha256: None,
            md5: None,
        };

        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            if let Some(value) = line.strip_prefix("SHA256:") {
                parsed.sha256 = Some(value.trim().to_lowercase());
            } else if let Some(value) = line.strip_prefix("MD5:") {
                parsed.md5 = Some(value.trim().to_lowercase());
            }
        }

        parsed
    }
}
