//! Artifact builder
//!
//! Prepares clean working directories, hands the job to a [`Packager`], and
//! selects the single binary it produced. More or fewer than one candidate
//! is an error.

mod command;

pub use command::{CommandPackager, ASSET_SEPARATOR};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::Glob;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ResolvedPaths;
use release_provenance::Artifact;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing build input {kind}: {path}")]
    MissingInput { kind: &'static str, path: String },

    #[error("failed to prepare {path}: {source}")]
    Workspace {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("packager could not be started ({program}): {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("packager exited with {status}: {stderr}")]
    PackagerFailed { status: String, stderr: String },

    #[error("invalid candidate pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("packager produced no artifact matching '{pattern}' in {dir}")]
    NoArtifact { pattern: String, dir: String },

    #[error("packager produced {} candidates matching '{}': {}", .candidates.len(), .pattern, .candidates.join(", "))]
    AmbiguousArtifact { pattern: String, candidates: Vec<String> },

    #[error("scan of {dir} failed: {reason}")]
    Scan { dir: String, reason: String },
}

/// One packaging job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageJob {
    /// Derived artifact name
    pub name: String,
    pub entry: PathBuf,
    pub icon: PathBuf,
    pub assets: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// Capability: turn a source tree into one executable in `output_dir`
pub trait Packager {
    fn package(&self, job: &PackageJob) -> Result<(), BuildError>;
}

/// Runs a [`Packager`] inside pipeline-owned directories
pub struct ArtifactBuilder<'a, P: Packager + ?Sized> {
    packager: &'a P,
    paths: &'a ResolvedPaths,
    candidate_glob: &'a str,
}

impl<'a, P: Packager + ?Sized> ArtifactBuilder<'a, P> {
    pub fn new(packager: &'a P, paths: &'a ResolvedPaths, candidate_glob: &'a str) -> Self {
        Self {
            packager,
            paths,
            candidate_glob,
        }
    }

    /// Build the artifact called `name`
    pub fn build(&self, name: &str) -> Result<Artifact, BuildError> {
        self.check_inputs()?;

        let job = PackageJob {
            name: name.to_string(),
            entry: self.paths.entry.clone(),
            icon: self.paths.icon.clone(),
            assets: self.paths.assets.clone(),
            output_dir: self.paths.output_dir.clone(),
            work_dir: self.paths.work_dir.clone(),
        };

        clean_dir(&job.output_dir)?;
        clean_dir(&job.work_dir)?;

        info!(artifact = %name, output = %job.output_dir.display(), "invoking packager");
        self.packager.package(&job)?;

        let pattern = self.candidate_glob.replace("{name}", name);
        let path = select_single_candidate(&job.output_dir, &pattern)?;

        let artifact = Artifact::from_path(name, &path).map_err(|source| BuildError::Workspace {
            path: path.display().to_string(),
            source,
        })?;
        info!(file = %artifact.file_name(), size = artifact.size(), "artifact built");
        Ok(artifact)
    }

    fn check_inputs(&self) -> Result<(), BuildError> {
        if !self.paths.entry.is_file() {
            return Err(missing("entry point", &self.paths.entry));
        }
        if !self.paths.icon.is_file() {
            return Err(missing("icon", &self.paths.icon));
        }
        for asset in &self.paths.assets {
            if !asset.is_dir() {
                return Err(missing("asset directory", asset));
            }
        }
        Ok(())
    }
}

fn missing(kind: &'static str, path: &Path) -> BuildError {
    BuildError::MissingInput {
        kind,
        path: path.display().to_string(),
    }
}

/// Remove `dir` and everything in it, then recreate it empty
pub fn clean_dir(dir: &Path) -> Result<(), BuildError> {
    let wrap = |source: io::Error| BuildError::Workspace {
        path: dir.display().to_string(),
        source,
    };

    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir.display(), "removed stale directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(wrap(e)),
    }
    fs::create_dir_all(dir).map_err(wrap)
}

/// Find exactly one regular file directly in `dir` whose name matches `pattern`
pub fn select_single_candidate(dir: &Path, pattern: &str) -> Result<PathBuf, BuildError> {
    let matcher = Glob::new(pattern)
        .map_err(|e| BuildError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| BuildError::Scan {
            dir: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
            candidates.push(entry.into_path());
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(BuildError::NoArtifact {
            pattern: pattern.to_string(),
            dir: dir.display().to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(BuildError::AmbiguousArtifact {
            pattern: pattern.to_string(),
            candidates: candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|f| f.to_string_lossy().to_string())
                .collect(),
        }),
    }
}
