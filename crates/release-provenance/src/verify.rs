//! Offline verification of a downloaded release
//!
//! Recomputes the artifact digests and compares them against both published
//! documents. Every mismatch is reported, not just the first.

use std::fmt;
use std::path::Path;

use crate::attestation::AttestationRecord;
use crate::fingerprint::{DigestPair, FingerprintError};
use crate::manifest::ChecksumManifest;

/// A single disagreement between the artifact and a published document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The checksum manifest has no line for this digest
    MissingChecksum { algorithm: &'static str },

    /// The checksum manifest disagrees with the artifact
    ChecksumMismatch {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    /// The attestation disagrees with the artifact
    AttestationMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationError::MissingChecksum { algorithm } => {
                write!(f, "checksum manifest has no {} line", algorithm)
            }
            VerificationError::ChecksumMismatch {
                algorithm,
                expected,
                actual,
            } => write!(
                f,
                "checksum manifest {} mismatch: expected {}, got {}",
                algorithm,
                short(expected),
                short(actual)
            ),
            VerificationError::AttestationMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "attestation executable.{} mismatch: expected {}, got {}",
                field,
                short(expected),
                short(actual)
            ),
        }
    }
}

fn short(value: &str) -> &str {
    value.get(..12).unwrap_or(value)
}

/// Outcome of [`verify_artifact`]
#[derive(Debug)]
pub struct VerificationReport {
    pub passed: bool,
    pub errors: Vec<VerificationError>,
    /// Digests recomputed from the artifact
    pub actual: DigestPair,
}

impl VerificationReport {
    /// One-line description for terminal output
    pub fn summary(&self) -> String {
        match self.errors.len() {
            0 => format!("verified: sha256 {}", self.actual.sha256()),
            1 => format!("verification failed: {}", self.errors[0]),
            n => format!("verification failed: {} errors (first: {})", n, self.errors[0]),
        }
    }
}

/// Verify an artifact against its checksum manifest text and attestation
pub fn verify_artifact(
    artifact_path: &Path,
    checksum_text: &str,
    attestation: &AttestationRecord,
) -> Result<VerificationReport, FingerprintError> {
    let actual = DigestPair::from_file(artifact_path)?;
    let parsed = ChecksumManifest::parse(checksum_text);
    let mut errors = Vec::new();

    check_checksum("SHA256", parsed.sha256.as_deref(), actual.sha256(), &mut errors);
    check_checksum("MD5", parsed.md5.as_deref(), actual.md5(), &mut errors);

    let executable = &attestation.executable;
    if !executable.sha256().eq_ignore_ascii_case(actual.sha256()) {
        errors.push(VerificationError::AttestationMismatch {
            field: "sha256",
            expected: executable.sha256().to_string(),
            actual: actual.sha256().to_string(),
        });
    }
    if !executable.md5().eq_ignore_ascii_case(actual.md5()) {
        errors.push(VerificationError::AttestationMismatch {
            field: "md5",
            expected: executable.md5().to_string(),
            actual: actual.md5().to_string(),
        });
    }
    if executable.size() != actual.bytes() {
        errors.push(VerificationError::AttestationMismatch {
            field: "size",
            expected: executable.size().to_string(),
            actual: actual.bytes().to_string(),
        });
    }

    Ok(VerificationReport {
        passed: errors.is_empty(),
        errors,
        actual,
    })
}

fn check_checksum(
    algorithm: &'static str,
    recorded: Option<&str>,
    actual: &str,
    errors: &mut Vec<VerificationError>,
) {
    match recorded {
        None => errors.push(VerificationError::MissingChecksum { algorithm }),
        Some(expected) if expected != actual => errors.push(VerificationError::ChecksumMismatch {
            algorithm,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        Some(_) => {}
    }
}
