//! Failure taxonomy and stable exit codes

use serde::{Deserialize, Serialize};

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Release created with all files attached
    Success,
    /// Aborted at the first failing stage
    Failed,
}

/// Failure kind - categorizes the cause of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Configuration could not be loaded or validated
    Config,
    /// Build request rejected before any stage ran
    InvalidRequest,
    /// Packager produced no usable artifact
    Build,
    /// Digest computation or manifest write failed
    Fingerprint,
    /// Attestation could not be assembled or written
    Provenance,
    /// Release tag already exists
    TagConflict,
    /// Tag availability could not be checked; nothing was created
    TagLookup,
    /// Tag could not be created or pushed
    TagPush,
    /// Release record could not be created
    Publish,
}

impl FailureKind {
    /// Get the stable exit code for this failure kind
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::Config => ExitCode::Config,
            FailureKind::InvalidRequest => ExitCode::InvalidRequest,
            FailureKind::Build => ExitCode::BuildFailed,
            FailureKind::Fingerprint => ExitCode::FingerprintFailed,
            FailureKind::Provenance => ExitCode::ProvenanceFailed,
            FailureKind::TagConflict => ExitCode::TagConflict,
            FailureKind::TagLookup | FailureKind::TagPush => ExitCode::TagPushFailed,
            FailureKind::Publish => ExitCode::PublishFailed,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::Config => "Configuration error",
            FailureKind::InvalidRequest => "Invalid build request",
            FailureKind::Build => "Build failed",
            FailureKind::Fingerprint => "Fingerprinting failed",
            FailureKind::Provenance => "Provenance record failed",
            FailureKind::TagConflict => "Release tag already exists",
            FailureKind::TagLookup => "Release tag lookup failed",
            FailureKind::TagPush => "Tag creation or push failed",
            FailureKind::Publish => "Release publish failed",
        }
    }
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,
    Config = 2,
    InvalidRequest = 3,
    BuildFailed = 10,
    FingerprintFailed = 20,
    ProvenanceFailed = 30,
    TagConflict = 40,
    TagPushFailed = 41,
    PublishFailed = 60,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            2 => Some(ExitCode::Config),
            3 => Some(ExitCode::InvalidRequest),
            10 => Some(ExitCode::BuildFailed),
            20 => Some(ExitCode::FingerprintFailed),
            30 => Some(ExitCode::ProvenanceFailed),
            40 => Some(ExitCode::TagConflict),
            41 => Some(ExitCode::TagPushFailed),
            60 => Some(ExitCode::PublishFailed),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}
