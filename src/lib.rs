//! Release Lane - tagged release builds with provenance
//!
//! Turns a release request into a published release: the artifact is built
//! by an external packager, fingerprinted, described by an attestation,
//! tagged in version control and published with its checksum manifest and
//! attestation attached.
//!
//! The packager, the tag remote and the release host sit behind the
//! [`Packager`], [`TagGateway`] and [`ReleaseHost`] traits; [`mock`] has
//! in-process fakes for all three.

pub mod builder;
pub mod config;
pub mod mock;
pub mod naming;
pub mod notes;
pub mod pipeline;
pub mod publish;
pub mod request;
pub mod summary;
pub mod vcs;

pub use builder::{ArtifactBuilder, BuildError, CommandPackager, PackageJob, Packager};
pub use config::{ConfigError, EffectiveConfig, LaneConfig};
pub use naming::{artifact_name, sanitize_version};
pub use notes::{compose_notes, NotesInput, NotesTemplates, ReleaseNotes};
pub use pipeline::{Pipeline, PipelineError, ReleaseOutcome, ReleasePlan, Stage};
pub use publish::{
    GhCliHost, PublishError, PublishedRelease, ReleaseFiles, ReleaseHost, ReleaseSpec,
};
pub use request::{BuildIdentity, BuildRequest, PartialIdentity, RequestError};
pub use summary::{ExitCode, FailureKind, RunSummary};
pub use vcs::{GitGateway, TagError, TagGateway};
