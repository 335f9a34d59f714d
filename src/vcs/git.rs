//! System git backend

use std::path::PathBuf;
use std::process::{Command, Output};

use tracing::{debug, info};

use super::{TagError, TagGateway, TagLocation};
use crate::config::VcsSettings;

/// [`TagGateway`] that shells out to the `git` binary
#[derive(Debug, Clone)]
pub struct GitGateway {
    program: String,
    remote: String,
    work_tree: PathBuf,
}

impl GitGateway {
    pub fn new(settings: &VcsSettings, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            program: settings.git_program.clone(),
            remote: settings.remote.clone(),
            work_tree: work_tree.into(),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Commit checked out in the work tree, for runs outside CI
    pub fn head_revision(&self) -> Result<String, TagError> {
        let output = self.run(&["rev-parse", "HEAD"])?;
        if !output.status.success() {
            return Err(failed("git rev-parse", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.work_tree);
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Output, TagError> {
        debug!(program = %self.program, ?args, "git");
        self.git_cmd().args(args).output().map_err(|source| TagError::Spawn {
            program: self.program.clone(),
            source,
        })
    }

    fn local_tag_exists(&self, tag: &str) -> Result<bool, TagError> {
        let refname = tag_ref(tag);
        let output = self.run(&["rev-parse", "-q", "--verify", &refname])?;
        // rev-parse -q exits 1 with empty output for a missing ref
        Ok(output.status.success())
    }

    fn remote_tag_exists(&self, tag: &str) -> Result<bool, TagError> {
        let refname = tag_ref(tag);
        let output = self.run(&["ls-remote", "--tags", &self.remote, &refname])?;
        if !output.status.success() {
            return Err(failed("git ls-remote", &output));
        }
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }
}

fn tag_ref(tag: &str) -> String {
    format!("refs/tags/{}", tag)
}

fn failed(command: &str, output: &Output) -> TagError {
    TagError::CommandFailed {
        command: command.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl TagGateway for GitGateway {
    fn tag_exists(&self, tag: &str) -> Result<Option<TagLocation>, TagError> {
        if self.local_tag_exists(tag)? {
            return Ok(Some(TagLocation::Local));
        }
        if self.remote_tag_exists(tag)? {
            return Ok(Some(TagLocation::Remote));
        }
        Ok(None)
    }

    fn create_tag(&self, tag: &str, message: &str, revision: &str) -> Result<(), TagError> {
        if let Some(location) = self.tag_exists(tag)? {
            return Err(TagError::AlreadyExists {
                tag: tag.to_string(),
                location,
            });
        }

        let output = self.run(&["tag", "-a", tag, "-m", message, revision])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("already exists") {
                return Err(TagError::AlreadyExists {
                    tag: tag.to_string(),
                    location: TagLocation::Local,
                });
            }
            return Err(failed("git tag", &output));
        }

        info!(tag, revision, "annotated tag created");
        Ok(())
    }

    fn push_tag(&self, tag: &str) -> Result<(), TagError> {
        if !self.local_tag_exists(tag)? {
            return Err(TagError::NotCreated(tag.to_string()));
        }

        let refname = tag_ref(tag);
        let output = self.run(&["push", &self.remote, &refname])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("already exists") {
                return Err(TagError::AlreadyExists {
                    tag: tag.to_string(),
                    location: TagLocation::Remote,
                });
            }
            return Err(failed("git push", &output));
        }

        info!(tag, remote = %self.remote, "tag pushed");
        Ok(())
    }
}
