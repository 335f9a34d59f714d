//! GitHub CLI backend

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{PublishError, PublishedRelease, ReleaseHost, ReleaseSpec};
use crate::config::HostSettings;

/// [`ReleaseHost`] that runs `gh release create`
#[derive(Debug, Clone)]
pub struct GhCliHost {
    program: String,
    work_tree: PathBuf,
}

impl GhCliHost {
    pub fn new(settings: &HostSettings, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            program: settings.gh_program.clone(),
            work_tree: work_tree.into(),
        }
    }

    /// Arguments for `gh`; notes are read from stdin
    pub fn build_args(spec: &ReleaseSpec) -> Vec<String> {
        let mut args = vec!["release".to_string(), "create".to_string(), spec.tag().to_string()];
        args.extend(spec.files().iter().map(|f| f.to_string_lossy().to_string()));
        args.push("--title".to_string());
        args.push(spec.title().to_string());
        args.push("--notes-file".to_string());
        args.push("-".to_string());
        if spec.is_prerelease() {
            args.push("--prerelease".to_string());
        }
        // refuse to let gh create the tag itself
        args.push("--verify-tag".to_string());
        args
    }
}

impl ReleaseHost for GhCliHost {
    fn create_release(&self, spec: &ReleaseSpec) -> Result<PublishedRelease, PublishError> {
        let args = Self::build_args(spec);
        debug!(program = %self.program, ?args, "gh");

        let spawn_err = |source: std::io::Error| PublishError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.work_tree)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // gh may exit before reading the notes; its stderr explains why
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(spec.body().as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output().map_err(spawn_err)?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            if stderr.contains("already exists") {
                return Err(PublishError::AlreadyExists {
                    tag: spec.tag().to_string(),
                });
            }
            return Err(PublishError::CommandFailed {
                command: "gh release create".to_string(),
                stderr,
            });
        }
        written.map_err(spawn_err)?;

        let url = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .rfind(|l| l.starts_with("http"))
            .map(str::to_string)
            .ok_or_else(|| PublishError::Rejected(format!("no release URL in gh output ({})", stderr)))?;

        info!(tag = spec.tag(), %url, "release created");
        Ok(PublishedRelease {
            tag: spec.tag().to_string(),
            url,
            prerelease: spec.is_prerelease(),
            files: spec.file_names(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::ReleaseFiles;
    use std::fs;
    use tempfile::TempDir;

    fn spec(dir: &TempDir, prerelease: bool) -> ReleaseSpec {
        let files = ["Product-2.3-beta.exe", "checksums.txt", "build-attestation.json"]
            .iter()
            .map(|n| {
                let path = dir.path().join(n);
                fs::write(&path, b"x").unwrap();
                path
            })
            .collect();
        ReleaseSpec::new(
            "v2.3-beta",
            "Beta Release 2.3",
            "## Beta Release",
            prerelease,
            ReleaseFiles::new(files).unwrap(),
        )
    }

    #[test]
    fn test_args_for_prerelease() {
        let dir = TempDir::new().unwrap();
        let args = GhCliHost::build_args(&spec(&dir, true));

        assert_eq!(&args[..3], &["release", "create", "v2.3-beta"]);
        assert!(args[3].ends_with("Product-2.3-beta.exe"));
        assert!(args[5].ends_with("build-attestation.json"));
        assert!(args.contains(&"--prerelease".to_string()));
        assert!(args.contains(&"--verify-tag".to_string()));
        assert!(!args.iter().any(|a| a == "--draft"));

        let title_at = args.iter().position(|a| a == "--title").unwrap();
        assert_eq!(args[title_at + 1], "Beta Release 2.3");
    }

    #[test]
    fn test_args_for_stable() {
        let dir = TempDir::new().unwrap();
        let args = GhCliHost::build_args(&spec(&dir, false));
        assert!(!args.contains(&"--prerelease".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_already_exists_is_mapped() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-gh");
        fs::write(
            &script,
            "#!/bin/sh\ncat >/dev/null\necho 'a release with the same tag name already exists: v2.3-beta' >&2\nexit 1\n",
        )
        .unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let settings = HostSettings {
            gh_program: script.to_string_lossy().to_string(),
            ..HostSettings::default()
        };
        let host = GhCliHost::new(&settings, dir.path());

        let err = host.create_release(&spec(&dir, true)).unwrap_err();
        assert!(matches!(err, PublishError::AlreadyExists { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_early_exit_reports_gh_stderr() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-gh");
        fs::write(&script, "#!/bin/sh\necho 'HTTP 401: Bad credentials' >&2\nexit 4\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let settings = HostSettings {
            gh_program: script.to_string_lossy().to_string(),
            ..HostSettings::default()
        };
        let files = ["Product-1.0.exe", "checksums.txt", "build-attestation.json"]
            .iter()
            .map(|n| {
                let path = dir.path().join(n);
                fs::write(&path, b"x").unwrap();
                path
            })
            .collect();
        // larger than a pipe buffer, so the write fails once gh is gone
        let body = "x".repeat(1 << 20);
        let spec = ReleaseSpec::new("v1.0", "Release 1.0", body, false, ReleaseFiles::new(files).unwrap());

        let err = GhCliHost::new(&settings, dir.path()).create_release(&spec).unwrap_err();
        match err {
            PublishError::CommandFailed { stderr, .. } => assert!(stderr.contains("Bad credentials")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_release_url_read_from_stdout() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-gh");
        fs::write(
            &script,
            "#!/bin/sh\ncat >/dev/null\necho 'https://github.com/acme/product/releases/tag/v2.3-beta'\n",
        )
        .unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let settings = HostSettings {
            gh_program: script.to_string_lossy().to_string(),
            ..HostSettings::default()
        };
        let release = GhCliHost::new(&settings, dir.path())
            .create_release(&spec(&dir, true))
            .unwrap();

        assert_eq!(release.url, "https://github.com/acme/product/releases/tag/v2.3-beta");
        assert!(release.prerelease);
        assert_eq!(release.files.len(), 3);
    }
}
