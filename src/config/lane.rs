//! Typed lane configuration
//!
//! Deserialized from the merged configuration layers. Every field has a
//! built-in default, so an empty repo file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::notes::NotesTemplates;
use release_provenance::{ATTESTATION_FILE_NAME, CHECKSUM_FILE_NAME};

/// Default repo config location, relative to the repository root
pub const REPO_CONFIG_PATH: &str = ".release/lane.toml";

/// Complete lane configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Product identifier prefixed to every artifact name
    pub product: String,
    pub build: BuildSettings,
    pub packager: PackagerSettings,
    pub publish: PublishSettings,
    pub vcs: VcsSettings,
    pub host: HostSettings,
    pub notes: NotesTemplates,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            product: "Product".to_string(),
            build: BuildSettings::default(),
            packager: PackagerSettings::default(),
            publish: PublishSettings::default(),
            vcs: VcsSettings::default(),
            host: HostSettings::default(),
            notes: NotesTemplates::default(),
        }
    }
}

impl LaneConfig {
    /// Resolve relative paths against the repository root
    pub fn resolve(&self, root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            root: root.to_path_buf(),
            entry: root.join(&self.build.entry),
            icon: root.join(&self.build.icon),
            assets: self.build.assets.iter().map(|a| root.join(a)).collect(),
            output_dir: root.join(&self.build.output_dir),
            work_dir: root.join(&self.build.work_dir),
            release_dir: root.join(&self.publish.release_dir),
        }
    }
}

/// Inputs and outputs of the packager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Source entry point handed to the packager
    pub entry: String,
    /// Product icon resource
    pub icon: String,
    /// Auxiliary asset directories embedded into the artifact
    pub assets: Vec<String>,
    /// Where the packager writes the finished binary
    pub output_dir: String,
    /// Packager scratch space
    pub work_dir: String,
    /// Glob selecting artifact candidates in `output_dir`; `{name}` expands
    pub candidate_glob: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            entry: "main.py".to_string(),
            icon: "assets/icon.ico".to_string(),
            assets: vec![
                "assets".to_string(),
                "core".to_string(),
                "interface".to_string(),
                "utils".to_string(),
            ],
            output_dir: "dist".to_string(),
            work_dir: "build".to_string(),
            candidate_glob: "{name}*".to_string(),
        }
    }
}

/// External packager invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerSettings {
    pub program: String,
    /// Argument template; `{assets}` as a whole argument expands to the
    /// per-asset arguments
    pub args: Vec<String>,
    /// Arguments emitted once per asset directory
    pub asset_args: Vec<String>,
}

impl Default for PackagerSettings {
    fn default() -> Self {
        Self {
            program: "pyinstaller".to_string(),
            args: [
                "--noconfirm",
                "--clean",
                "--onefile",
                "--windowed",
                "--name",
                "{name}",
                "--icon",
                "{icon}",
                "--distpath",
                "{dist}",
                "--workpath",
                "{work}",
                "--specpath",
                "{work}",
                "{assets}",
                "{entry}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            asset_args: vec!["--add-data".to_string(), "{asset}{sep}{asset}".to_string()],
        }
    }
}

/// Published file names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    /// Directory receiving the checksum manifest, attestation and summary
    pub release_dir: String,
    pub checksum_file: String,
    pub attestation_file: String,
    pub summary_file: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            release_dir: "release".to_string(),
            checksum_file: CHECKSUM_FILE_NAME.to_string(),
            attestation_file: ATTESTATION_FILE_NAME.to_string(),
            summary_file: "release_summary.json".to_string(),
        }
    }
}

/// Tag creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsSettings {
    /// Canonical remote the tag is pushed to
    pub remote: String,
    pub git_program: String,
}

impl Default for VcsSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            git_program: "git".to_string(),
        }
    }
}

/// Hosting platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub gh_program: String,
    /// Used for links when `GITHUB_SERVER_URL` is unset
    pub server_url: String,
    /// Used when `GITHUB_WORKFLOW` is unset
    pub workflow: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            gh_program: "gh".to_string(),
            server_url: "https://github.com".to_string(),
            workflow: "Build and Release".to_string(),
        }
    }
}

/// Config paths joined onto the repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub entry: PathBuf,
    pub icon: PathBuf,
    pub assets: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub release_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LaneConfig::default();
        assert_eq!(config.product, "Product");
        assert_eq!(config.build.entry, "main.py");
        assert_eq!(config.build.assets.len(), 4);
        assert_eq!(config.packager.program, "pyinstaller");
        assert!(config.packager.args.contains(&"{assets}".to_string()));
        assert_eq!(config.publish.checksum_file, "checksums.txt");
        assert_eq!(config.publish.attestation_file, "build-attestation.json");
        assert_eq!(config.vcs.remote, "origin");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let value = serde_json::json!({"product": "DigTool", "build": {"entry": "app.py"}});
        let config: LaneConfig = serde_json::from_value(value).unwrap();

        assert_eq!(config.product, "DigTool");
        assert_eq!(config.build.entry, "app.py");
        assert_eq!(config.build.icon, "assets/icon.ico");
        assert_eq!(config.host.gh_program, "gh");
    }

    #[test]
    fn test_resolve_joins_root() {
        let config = LaneConfig::default();
        let paths = config.resolve(Path::new("/repo"));

        assert_eq!(paths.entry, PathBuf::from("/repo/main.py"));
        assert_eq!(paths.assets[1], PathBuf::from("/repo/core"));
        assert_eq!(paths.output_dir, PathBuf::from("/repo/dist"));
        assert_eq!(paths.release_dir, PathBuf::from("/repo/release"));
    }
}
