//! Release provenance types
//!
//! Digests, checksum manifests and build attestations for a single packaged
//! artifact. Everything here is a pure function of its inputs except the
//! file reads in [`FingerprintSet::compute`] and the `write_to_file` helpers.

pub mod artifact;
pub mod attestation;
pub mod fingerprint;
pub mod manifest;
pub mod verify;

pub use artifact::Artifact;
pub use attestation::{
    AttestationError, AttestationRecord, BuildInfo, ExecutableIdentity, VerificationLinks,
    ATTESTATION_FILE_NAME,
};
pub use fingerprint::{digest_bytes, DigestPair, FingerprintError, FingerprintSet};
pub use manifest::{ChecksumManifest, ManifestContext, CHECKSUM_FILE_NAME};
pub use verify::{verify_artifact, VerificationError, VerificationReport};

/// Timestamp format used in the checksum manifest header.
pub const MANIFEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
