//! Release pipeline orchestration
//!
//! Runs the stages in a fixed order and stops at the first failure:
//!
//! 1. Preflight: the release tag must not exist yet (read-only check)
//! 2. Build: package the artifact into a clean output directory
//! 3. Fingerprint: digest the artifact and write the checksum manifest
//! 4. Provenance: write the attestation, reusing the fingerprint digests
//! 5. Tag: create and push the annotated release tag
//! 6. Notes: compose the release notes
//! 7. Publish: create the release with its three files
//!
//! Nothing is rolled back. A failure after the Tag stage leaves a pushed tag
//! without a release; the error, the log and the run summary all say so.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::builder::{clean_dir, ArtifactBuilder, BuildError, Packager};
use crate::config::{LaneConfig, ResolvedPaths};
use crate::naming::artifact_name;
use crate::notes::{compose_notes, NotesInput, ReleaseNotes};
use crate::publish::{PublishError, PublishedRelease, ReleaseFiles, ReleaseHost, ReleaseSpec};
use crate::request::BuildRequest;
use crate::summary::{FailureKind, RunSummary};
use crate::vcs::{tag_message, TagError, TagGateway};
use release_provenance::{
    Artifact, AttestationError, AttestationRecord, BuildInfo, FingerprintError, FingerprintSet,
    ManifestContext, VerificationLinks,
};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Preflight,
    Build,
    Fingerprint,
    Provenance,
    Tag,
    Notes,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Preflight,
        Stage::Build,
        Stage::Fingerprint,
        Stage::Provenance,
        Stage::Tag,
        Stage::Notes,
        Stage::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::Build => "build",
            Stage::Fingerprint => "fingerprint",
            Stage::Provenance => "provenance",
            Stage::Tag => "tag",
            Stage::Notes => "notes",
            Stage::Publish => "publish",
        }
    }

    /// Failure kind for errors raised in this stage, unless the error is a
    /// tag conflict
    fn failure_kind(&self) -> FailureKind {
        match self {
            Stage::Preflight => FailureKind::TagLookup,
            Stage::Tag => FailureKind::TagPush,
            Stage::Build => FailureKind::Build,
            Stage::Fingerprint => FailureKind::Fingerprint,
            Stage::Provenance => FailureKind::Provenance,
            Stage::Notes | Stage::Publish => FailureKind::Publish,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of a stage failure
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A run aborted at `stage`
#[derive(Debug)]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: FailureKind,
    /// The release tag is already on the remote
    pub tag_pushed: bool,
    pub tag: String,
    pub source: StageError,
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code().as_i32()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.source)?;
        if self.tag_pushed {
            write!(
                f,
                "; tag '{}' was pushed but no release exists for it (delete the tag or release under a new one)",
                self.tag
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// What a run would do, computed without side effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    pub tag: String,
    pub title: String,
    pub artifact_name: String,
    pub prerelease: bool,
    pub tag_message: String,
    pub revision: String,
    /// Glob the packager output must match exactly once
    pub candidate_pattern: String,
    pub output_dir: PathBuf,
    pub release_dir: PathBuf,
    /// Attachment names; the artifact entry is the candidate pattern
    pub attachments: Vec<String>,
    pub stages: Vec<Stage>,
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub artifact: Artifact,
    pub fingerprints: FingerprintSet,
    pub checksum_path: PathBuf,
    pub attestation: AttestationRecord,
    pub attestation_path: PathBuf,
    pub notes: ReleaseNotes,
    pub release: PublishedRelease,
    pub summary: RunSummary,
}

/// Values produced by the stages, threaded forward
struct Produced {
    artifact: Artifact,
    fingerprints: FingerprintSet,
    checksum_path: PathBuf,
    attestation: AttestationRecord,
    attestation_path: PathBuf,
    notes: ReleaseNotes,
    release: PublishedRelease,
}

type StageFailure = (Stage, StageError);

fn at<E: Into<StageError>>(stage: Stage) -> impl Fn(E) -> StageFailure {
    move |e| (stage, e.into())
}

/// The release pipeline
pub struct Pipeline<'a> {
    config: &'a LaneConfig,
    paths: ResolvedPaths,
    packager: &'a dyn Packager,
    gateway: &'a dyn TagGateway,
    host: &'a dyn ReleaseHost,
}

impl<'a> Pipeline<'a> {
    /// Paths in `config` are resolved against `root`
    pub fn new(
        config: &'a LaneConfig,
        root: &Path,
        packager: &'a dyn Packager,
        gateway: &'a dyn TagGateway,
        host: &'a dyn ReleaseHost,
    ) -> Self {
        Self {
            config,
            paths: config.resolve(root),
            packager,
            gateway,
            host,
        }
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    fn candidate_pattern(&self, name: &str) -> String {
        self.config.build.candidate_glob.replace("{name}", name)
    }

    /// Dry run: derive names and file layout only
    pub fn plan(&self, request: &BuildRequest) -> ReleasePlan {
        let name = artifact_name(&self.config.product, request.tag());
        let publish = &self.config.publish;

        ReleasePlan {
            tag: request.tag().to_string(),
            title: request.name().to_string(),
            candidate_pattern: self.candidate_pattern(&name),
            attachments: vec![
                self.candidate_pattern(&name),
                publish.checksum_file.clone(),
                publish.attestation_file.clone(),
            ],
            artifact_name: name,
            prerelease: request.is_beta(),
            tag_message: tag_message(request.name()),
            revision: request.identity().revision.clone(),
            output_dir: self.paths.output_dir.clone(),
            release_dir: self.paths.release_dir.clone(),
            stages: Stage::ALL.to_vec(),
        }
    }

    /// Run every stage. The run summary is written whether or not the run
    /// succeeds.
    pub fn run(&self, request: &BuildRequest) -> Result<ReleaseOutcome, PipelineError> {
        let started = Instant::now();
        let identity = request.identity();
        info!(
            tag = request.tag(),
            name = request.name(),
            beta = request.is_beta(),
            run_id = %identity.run_id,
            revision = %identity.revision,
            "release pipeline started"
        );

        let mut summary = RunSummary::started(identity.run_id.clone(), request.tag());
        let result = self.execute(request, &mut summary);
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(produced) => {
                let summary = summary.succeed(produced.release.url.clone(), duration_ms);
                self.write_summary(&summary);
                info!(url = %produced.release.url, duration_ms, "release published");

                Ok(ReleaseOutcome {
                    artifact: produced.artifact,
                    fingerprints: produced.fingerprints,
                    checksum_path: produced.checksum_path,
                    attestation: produced.attestation,
                    attestation_path: produced.attestation_path,
                    notes: produced.notes,
                    release: produced.release,
                    summary,
                })
            }
            Err((stage, source)) => {
                let kind = match &source {
                    StageError::Tag(e) if e.is_conflict() => FailureKind::TagConflict,
                    _ => stage.failure_kind(),
                };
                let err = PipelineError {
                    stage,
                    kind,
                    tag_pushed: summary.tag_pushed,
                    tag: request.tag().to_string(),
                    source,
                };

                error!(%stage, exit_code = err.exit_code(), error = %err.source, "release pipeline aborted");
                if err.tag_pushed {
                    warn!(
                        tag = request.tag(),
                        remote = %self.config.vcs.remote,
                        "tag was pushed but the release was not created; remove the tag manually or release under a new tag"
                    );
                }

                let summary = summary.fail(stage, kind, err.source.to_string(), duration_ms);
                self.write_summary(&summary);
                Err(err)
            }
        }
    }

    fn execute(&self, request: &BuildRequest, summary: &mut RunSummary) -> Result<Produced, StageFailure> {
        let name = artifact_name(&self.config.product, request.tag());
        summary.artifact_name = Some(name.clone());

        self.preflight(request.tag()).map_err(at(Stage::Preflight))?;
        summary.complete_stage(Stage::Preflight);

        let artifact = ArtifactBuilder::new(self.packager, &self.paths, &self.config.build.candidate_glob)
            .build(&name)
            .map_err(at(Stage::Build))?;
        summary.complete_stage(Stage::Build);

        let generated_at = Utc::now();
        let (fingerprints, checksum_path) = self
            .fingerprint(request, &artifact, generated_at)
            .map_err(at(Stage::Fingerprint))?;
        summary.complete_stage(Stage::Fingerprint);

        let (attestation, attestation_path) = self
            .record_provenance(request, &artifact, &fingerprints, generated_at)
            .map_err(at(Stage::Provenance))?;
        summary.attestation_digest = Some(
            attestation
                .canonical_sha256()
                .map_err(at(Stage::Provenance))?,
        );
        // attachments are checked before anything is pushed
        let files = ReleaseFiles::new(vec![
            artifact.path().to_path_buf(),
            checksum_path.clone(),
            attestation_path.clone(),
        ])
        .map_err(at(Stage::Provenance))?;
        summary.complete_stage(Stage::Provenance);

        let identity = request.identity();
        self.gateway
            .create_tag(request.tag(), &tag_message(request.name()), &identity.revision)
            .map_err(at(Stage::Tag))?;
        self.gateway.push_tag(request.tag()).map_err(at(Stage::Tag))?;
        summary.tag_pushed = true;
        info!(tag = request.tag(), remote = %self.config.vcs.remote, "release tag pushed");
        summary.complete_stage(Stage::Tag);

        let publish = &self.config.publish;
        let notes = compose_notes(
            &NotesInput {
                beta: request.is_beta(),
                custom: request.notes(),
                sha256: fingerprints.sha256(),
                run_url: &attestation.verification.workflow_url,
                checksum_file: &publish.checksum_file,
                attestation_file: &publish.attestation_file,
            },
            &self.config.notes,
        );
        summary.complete_stage(Stage::Notes);

        let spec = ReleaseSpec::new(request.tag(), request.name(), notes.as_str(), request.is_beta(), files);
        let release = self.host.create_release(&spec).map_err(at(Stage::Publish))?;
        summary.complete_stage(Stage::Publish);

        Ok(Produced {
            artifact,
            fingerprints,
            checksum_path,
            attestation,
            attestation_path,
            notes,
            release,
        })
    }

    fn preflight(&self, tag: &str) -> Result<(), TagError> {
        match self.gateway.tag_exists(tag)? {
            Some(location) => Err(TagError::AlreadyExists {
                tag: tag.to_string(),
                location,
            }),
            None => {
                info!(tag, "release tag is available");
                Ok(())
            }
        }
    }

    fn fingerprint(
        &self,
        request: &BuildRequest,
        artifact: &Artifact,
        generated_at: chrono::DateTime<Utc>,
    ) -> Result<(FingerprintSet, PathBuf), StageError> {
        let identity = request.identity();
        let context = ManifestContext {
            generated_at,
            workflow: identity.workflow.clone(),
            run_id: identity.run_id.clone(),
            commit: identity.revision.clone(),
        };
        let fingerprints = FingerprintSet::compute(artifact, &context)?;
        info!(sha256 = fingerprints.sha256(), md5 = fingerprints.md5(), "artifact fingerprinted");

        clean_dir(&self.paths.release_dir)?;
        let path = self.paths.release_dir.join(&self.config.publish.checksum_file);
        fingerprints
            .manifest()
            .write_to_file(&path)
            .map_err(|source| io_error(&path, source))?;

        Ok((fingerprints, path))
    }

    fn record_provenance(
        &self,
        request: &BuildRequest,
        artifact: &Artifact,
        fingerprints: &FingerprintSet,
        generated_at: chrono::DateTime<Utc>,
    ) -> Result<(AttestationRecord, PathBuf), StageError> {
        let identity = request.identity();
        let build_info = BuildInfo {
            workflow: identity.workflow.clone(),
            run_id: identity.run_id.clone(),
            run_number: identity.run_number.clone(),
            actor: identity.actor.clone(),
            repository: identity.repository.clone(),
            git_ref: identity.git_ref.clone(),
            sha: identity.revision.clone(),
            timestamp: BuildInfo::format_timestamp(generated_at),
        };
        let links = VerificationLinks::for_run(
            &identity.server_url,
            &identity.repository,
            &identity.run_id,
            &identity.revision,
        );

        let attestation = AttestationRecord::new(build_info, artifact, fingerprints, links);
        debug_assert!(attestation.binds(fingerprints));

        let path = self.paths.release_dir.join(&self.config.publish.attestation_file);
        attestation.write_to_file(&path)?;
        info!(path = %path.display(), "attestation written");

        Ok((attestation, path))
    }

    /// Best effort; a summary that cannot be written must not mask the
    /// run's own result
    fn write_summary(&self, summary: &RunSummary) {
        let path = self.paths.release_dir.join(&self.config.publish.summary_file);
        let written = fs::create_dir_all(&self.paths.release_dir).and_then(|_| summary.write_to_file(&path));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "failed to write run summary");
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> StageError {
    StageError::Io {
        path: path.display().to_string(),
        source,
    }
}
