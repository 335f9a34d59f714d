//! External packager invocation
//!
//! Expands the configured argument template and runs the packager program,
//! blocking until it exits. Stdout is discarded; stderr is kept for the
//! error message.

use std::process::{Command, Stdio};

use tracing::debug;

use super::{BuildError, PackageJob, Packager};
use crate::config::PackagerSettings;

/// Separator between source and destination in `--add-data` style arguments
#[cfg(windows)]
pub const ASSET_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const ASSET_SEPARATOR: &str = ":";

/// Placeholder that expands to the per-asset arguments
const ASSETS_PLACEHOLDER: &str = "{assets}";

/// Only this many trailing bytes of packager stderr are kept
const STDERR_TAIL_BYTES: usize = 4096;

/// A [`Packager`] backed by an external program
#[derive(Debug, Clone)]
pub struct CommandPackager {
    settings: PackagerSettings,
}

impl CommandPackager {
    pub fn new(settings: PackagerSettings) -> Self {
        Self { settings }
    }

    /// Expand the argument template for a job
    pub fn build_args(&self, job: &PackageJob) -> Vec<String> {
        let mut args = Vec::with_capacity(self.settings.args.len());

        for template in &self.settings.args {
            if template == ASSETS_PLACEHOLDER {
                for asset in &job.assets {
                    let asset = asset_arg_path(job, asset);
                    for asset_template in &self.settings.asset_args {
                        args.push(
                            asset_template
                                .replace("{asset}", &asset)
                                .replace("{sep}", ASSET_SEPARATOR),
                        );
                    }
                }
                continue;
            }
            args.push(expand(template, job));
        }

        args
    }
}

/// Assets are passed relative to the directory holding the entry point,
/// which is also the packager's working directory
fn asset_arg_path(job: &PackageJob, asset: &std::path::Path) -> String {
    let base = job.entry.parent().unwrap_or_else(|| std::path::Path::new(""));
    asset
        .strip_prefix(base)
        .unwrap_or(asset)
        .to_string_lossy()
        .to_string()
}

fn expand(template: &str, job: &PackageJob) -> String {
    template
        .replace("{name}", &job.name)
        .replace("{entry}", &job.entry.to_string_lossy())
        .replace("{icon}", &job.icon.to_string_lossy())
        .replace("{dist}", &job.output_dir.to_string_lossy())
        .replace("{work}", &job.work_dir.to_string_lossy())
}

impl Packager for CommandPackager {
    fn package(&self, job: &PackageJob) -> Result<(), BuildError> {
        let args = self.build_args(job);
        debug!(program = %self.settings.program, ?args, "packager command");

        let mut command = Command::new(&self.settings.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = job.entry.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| BuildError::Spawn {
            program: self.settings.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
            let tail = stderr.get(start..).unwrap_or(&stderr).trim().to_string();
            return Err(BuildError::PackagerFailed {
                status: output.status.to_string(),
                stderr: tail,
            });
        }

        Ok(())
    }
}
