//! Build attestation (build-attestation.json)
//!
//! Binds the artifact identity (name, digests, size) to the build identity
//! (workflow run, actor, source revision). The executable section can only be
//! built from a [`FingerprintSet`], so its digests are always the ones that
//! went into the checksum manifest.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

use crate::artifact::Artifact;
use crate::fingerprint::FingerprintSet;

/// Default published file name for the attestation document
pub const ATTESTATION_FILE_NAME: &str = "build-attestation.json";

/// Errors for attestation serialization
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JCS canonicalization error: {0}")]
    Jcs(String),
}

/// Who built it, from what, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub workflow: String,
    pub run_id: String,
    pub run_number: String,
    pub actor: String,
    pub repository: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    /// RFC 3339, second precision, `Z` suffix
    pub timestamp: String,
}

impl BuildInfo {
    /// Format a timestamp the way the attestation records it
    pub fn format_timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// What was built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableIdentity {
    name: String,
    sha256: String,
    md5: String,
    size: u64,
}

impl ExecutableIdentity {
    /// Copy the artifact identity out of an existing fingerprint set
    pub fn from_parts(artifact: &Artifact, fingerprints: &FingerprintSet) -> Self {
        Self {
            name: artifact.file_name().to_string(),
            sha256: fingerprints.sha256().to_string(),
            md5: fingerprints.md5().to_string(),
            size: fingerprints.digests().bytes(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn md5(&self) -> &str {
        &self.md5
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Where a reader can check the claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationLinks {
    pub workflow_url: String,
    pub commit_url: String,
}

impl VerificationLinks {
    /// Links into the hosting platform for a run and revision
    pub fn for_run(server_url: &str, repository: &str, run_id: &str, sha: &str) -> Self {
        let base = format!("{}/{}", server_url.trim_end_matches('/'), repository);
        Self {
            workflow_url: format!("{}/actions/runs/{}", base, run_id),
            commit_url: format!("{}/commit/{}", base, sha),
        }
    }
}

/// Attestation document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub build_info: BuildInfo,
    pub executable: ExecutableIdentity,
    pub verification: VerificationLinks,
}

impl AttestationRecord {
    /// Assemble an attestation; digests are taken from `fingerprints` as-is
    pub fn new(
        build_info: BuildInfo,
        artifact: &Artifact,
        fingerprints: &FingerprintSet,
        verification: VerificationLinks,
    ) -> Self {
        Self {
            build_info,
            executable: ExecutableIdentity::from_parts(artifact, fingerprints),
            verification,
        }
    }

    /// True when the executable section carries exactly these digests
    pub fn binds(&self, fingerprints: &FingerprintSet) -> bool {
        self.executable.sha256 == fingerprints.sha256()
            && self.executable.md5 == fingerprints.md5()
            && self.executable.size == fingerprints.digests().bytes()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> Result<(), AttestationError> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from file
    pub fn from_file(path: &Path) -> Result<Self, AttestationError> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }

    /// SHA-256 over the JCS form of the record
    pub fn canonical_sha256(&self) -> Result<String, AttestationError> {
        let bytes = serde_json_canonicalizer::to_vec(self)
            .map_err(|e| AttestationError::Jcs(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
