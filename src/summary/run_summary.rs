//! Run summary (release_summary.json)
//!
//! Written at the end of every pipeline run, successful or not. On failure
//! it records how far the run got, and in particular whether the release
//! tag had already been pushed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::failure::{ExitCode, FailureKind, Status};
use crate::pipeline::Stage;

/// Schema version for release_summary.json
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for release_summary.json
pub const RUN_SUMMARY_SCHEMA_ID: &str = "release-lane/run_summary@1";

/// Run summary (release_summary.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub schema_id: String,

    /// Workflow run identifier
    pub run_id: String,

    /// Release tag requested
    pub tag: String,

    /// Derived artifact name, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_name: Option<String>,

    pub created_at: DateTime<Utc>,

    pub status: Status,
    pub exit_code: i32,

    /// Stages that finished, in execution order
    pub completed_stages: Vec<Stage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// True once the tag is visible on the remote
    pub tag_pushed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,

    /// SHA-256 over the canonical (JCS) attestation document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation_digest: Option<String>,

    pub duration_ms: u64,

    pub human_summary: String,
}

impl RunSummary {
    /// Start a summary for a run that has not finished yet
    pub fn started(run_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            run_id: run_id.into(),
            tag: tag.into(),
            artifact_name: None,
            created_at: Utc::now(),
            status: Status::Failed,
            exit_code: ExitCode::Success.as_i32(),
            completed_stages: Vec::new(),
            failed_stage: None,
            failure_kind: None,
            error: None,
            tag_pushed: false,
            release_url: None,
            attestation_digest: None,
            duration_ms: 0,
            human_summary: String::new(),
        }
    }

    /// Record a finished stage
    pub fn complete_stage(&mut self, stage: Stage) {
        self.completed_stages.push(stage);
    }

    /// Finish as a success
    pub fn succeed(mut self, release_url: impl Into<String>, duration_ms: u64) -> Self {
        self.status = Status::Success;
        self.exit_code = ExitCode::Success.as_i32();
        self.release_url = Some(release_url.into());
        self.duration_ms = duration_ms;
        self.human_summary = format!(
            "Released {} ({} stages)",
            self.tag,
            self.completed_stages.len()
        );
        self
    }

    /// Finish as a failure at `stage`
    pub fn fail(mut self, stage: Stage, kind: FailureKind, error: impl Into<String>, duration_ms: u64) -> Self {
        self.status = Status::Failed;
        self.exit_code = kind.exit_code().as_i32();
        self.failed_stage = Some(stage);
        self.failure_kind = Some(kind);
        self.error = Some(error.into());
        self.duration_ms = duration_ms;

        let mut human = format!("{} at {} stage: {}", kind.description(), stage, self.tag);
        if self.tag_pushed {
            human.push_str(" (tag pushed without a release; delete it or release under a new tag)");
        }
        self.human_summary = human;
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }

    pub fn exit_code_enum(&self) -> Option<ExitCode> {
        ExitCode::from_i32(self.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progressed(stages: &[Stage]) -> RunSummary {
        let mut summary = RunSummary::started("1001", "v2.3-beta");
        for stage in stages {
            summary.complete_stage(*stage);
        }
        summary
    }

    #[test]
    fn test_success() {
        let run = progressed(&Stage::ALL).succeed("https://github.com/acme/product/releases/tag/v2.3-beta", 1200);

        assert_eq!(run.status, Status::Success);
        assert_eq!(run.exit_code, 0);
        assert_eq!(run.completed_stages.len(), 7);
        assert_eq!(run.failed_stage, None);
        assert_eq!(run.human_summary, "Released v2.3-beta (7 stages)");
    }

    #[test]
    fn test_failure_before_tag() {
        let run = progressed(&[Stage::Preflight]).fail(Stage::Build, FailureKind::Build, "no artifact", 50);

        assert_eq!(run.status, Status::Failed);
        assert_eq!(run.exit_code, 10);
        assert_eq!(run.failed_stage, Some(Stage::Build));
        assert!(!run.tag_pushed);
        assert!(!run.human_summary.contains("tag pushed"));
    }

    #[test]
    fn test_failure_after_tag_push_is_called_out() {
        let mut run = progressed(&[
            Stage::Preflight,
            Stage::Build,
            Stage::Fingerprint,
            Stage::Provenance,
            Stage::Tag,
            Stage::Notes,
        ]);
        run.tag_pushed = true;
        let run = run.fail(Stage::Publish, FailureKind::Publish, "HTTP 502", 900);

        assert_eq!(run.exit_code, 60);
        assert!(run.human_summary.contains("tag pushed without a release"));
        assert_eq!(run.exit_code_enum(), Some(ExitCode::PublishFailed));
    }

    #[test]
    fn test_serialization_shape() {
        let run = progressed(&[Stage::Preflight]).fail(Stage::Tag, FailureKind::TagConflict, "exists", 10);
        let json = run.to_json().unwrap();

        assert!(json.contains(r#""schema_id": "release-lane/run_summary@1""#));
        assert!(json.contains(r#""failed_stage": "tag""#));
        assert!(json.contains(r#""failure_kind": "TAG_CONFLICT""#));
        assert!(!json.contains("release_url"));
    }

    #[test]
    fn test_write_and_read_file() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let run = progressed(&Stage::ALL).succeed("https://example.test/r/1", 5);

        let path = dir.path().join("release_summary.json");
        run.write_to_file(&path).unwrap();

        let loaded = RunSummary::from_file(&path).unwrap();
        assert_eq!(loaded.run_id, "1001");
        assert_eq!(loaded.completed_stages, run.completed_stages);
        assert_eq!(loaded.release_url, run.release_url);
    }
}
