//! Artifact fingerprinting
//!
//! Both digests are computed in one pass over the artifact bytes. Digest
//! values depend only on the byte content, never on the file name, mtime or
//! time of invocation.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::artifact::Artifact;
use crate::manifest::{ChecksumManifest, ManifestContext};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Errors from fingerprinting an artifact
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("artifact {path} changed size: recorded {expected} bytes, read {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
}

/// SHA-256 and MD5 of the same byte sequence, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPair {
    sha256: String,
    md5: String,
    bytes: u64,
}

impl DigestPair {
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn md5(&self) -> &str {
        &self.md5
    }

    /// Number of bytes that went into both digests
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Digest everything the reader yields until EOF
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut sha256 = Sha256::new();
        let mut md5 = Md5::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut bytes = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            sha256.update(&buffer[..n]);
            md5.update(&buffer[..n]);
            bytes += n as u64;
        }

        Ok(Self {
            sha256: hex::encode(sha256.finalize()),
            md5: hex::encode(md5.finalize()),
            bytes,
        })
    }

    /// Digest a file on disk
    pub fn from_file(path: &Path) -> Result<Self, FingerprintError> {
        let file = File::open(path).map_err(|source| FingerprintError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file).map_err(|source| FingerprintError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Digest an in-memory byte slice
pub fn digest_bytes(data: &[u8]) -> DigestPair {
    let sha256 = hex::encode(Sha256::digest(data));
    let md5 = hex::encode(Md5::digest(data));
    DigestPair {
        sha256,
        md5,
        bytes: data.len() as u64,
    }
}

/// Digests of one artifact together with its rendered checksum manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintSet {
    artifact_name: String,
    digests: DigestPair,
    manifest: ChecksumManifest,
}

impl FingerprintSet {
    /// Fingerprint an artifact and render its checksum manifest.
    ///
    /// Fails if the number of bytes read differs from the size recorded
    /// when the artifact was built.
    pub fn compute(artifact: &Artifact, context: &ManifestContext) -> Result<Self, FingerprintError> {
        let digests = DigestPair::from_file(artifact.path())?;

        if digests.bytes() != artifact.size() {
            return Err(FingerprintError::SizeMismatch {
                path: artifact.path().display().to_string(),
                expected: artifact.size(),
                actual: digests.bytes(),
            });
        }

        Ok(Self::from_digests(artifact, digests, context))
    }

    /// Assemble from already computed digests
    pub fn from_digests(artifact: &Artifact, digests: DigestPair, context: &ManifestContext) -> Self {
        let manifest = ChecksumManifest::render(artifact.file_name(), context, &digests);
        Self {
            artifact_name: artifact.file_name().to_string(),
            digests,
            manifest,
        }
    }

    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    pub fn digests(&self) -> &DigestPair {
        &self.digests
    }

    pub fn sha256(&self) -> &str {
        self.digests.sha256()
    }

    pub fn md5(&self) -> &str {
        self.digests.md5()
    }

    pub fn manifest(&self) -> &ChecksumManifest {
        &self.manifest
    }
}
