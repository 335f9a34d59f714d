//! Effective configuration with provenance
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Repo config (`.release/lane.toml`)
//! 3. CLI overrides
//!
//! The merged value is kept (with secrets redacted) alongside the typed
//! [`LaneConfig`] so the run can report exactly what it used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::lane::{LaneConfig, REPO_CONFIG_PATH};
use super::merge::merge_layers;

/// Schema version for effective configuration output
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "release-lane/effective_config@1";

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Repo,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (repo layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (repo layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// Merged configuration with secrets redacted
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    lane: LaneConfig,
}

/// Keys that look like credentials
const SECRET_KEYS: &[&str] = &["token", "password", "secret", "private_key", "api_key", "credential"];

impl EffectiveConfig {
    /// Load the configuration for the repository at `root`.
    ///
    /// An explicit config path must exist. Without one, the default
    /// `<root>/.release/lane.toml` is used when present.
    pub fn load(root: &Path, explicit: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::build(Some(path), cli_overrides),
            None => {
                let default_path = root.join(REPO_CONFIG_PATH);
                let repo = Some(default_path.as_path()).filter(|p| p.exists());
                Self::build(repo, cli_overrides)
            }
        }
    }

    /// Merge the layers, validate, and produce the typed configuration
    pub fn build(repo_config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let defaults = serde_json::to_value(LaneConfig::default())
            .map_err(|e| ConfigError::Parse(format!("built-in defaults: {}", e)))?;

        let mut layers = vec![defaults];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = repo_config_path {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Repo,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let mut merged = merge_layers(layers);

        let lane: LaneConfig = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate(&lane)?;

        let mut redactions = Vec::new();
        redact(&mut merged, String::new(), &mut redactions);

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
            lane,
        })
    }

    /// The typed configuration
    pub fn lane(&self) -> &LaneConfig {
        &self.lane
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a merged value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.config, |current, part| current.get(part))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::Parse(format!("{}: invalid UTF-8: {}", path.display(), e)))?;

    // toml::Value serializes into the JSON data model directly
    let table: toml::Table = toml::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
    let value = serde_json::to_value(table)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

    Ok((value, digest))
}

fn redact(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let current = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let key_lower = key.to_lowercase();
                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String("[REDACTED]".to_string());
                    redactions.push(current);
                } else {
                    redact(val, current, redactions);
                }
            }
        }
        Value::Array(items) => {
            for (i, val) in items.iter_mut().enumerate() {
                redact(val, format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}

fn validate(lane: &LaneConfig) -> Result<(), ConfigError> {
    if lane.product.is_empty()
        || !lane
            .product
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "product '{}' must be non-empty and contain only [A-Za-z0-9._-]",
            lane.product
        )));
    }

    if lane.build.entry.trim().is_empty() {
        return Err(ConfigError::Validation("build.entry must not be empty".to_string()));
    }

    validate_owned_dirs(lane)?;

    if lane.packager.program.trim().is_empty() {
        return Err(ConfigError::Validation("packager.program must not be empty".to_string()));
    }

    if !lane.notes.footer.contains("{sha256}") {
        return Err(ConfigError::Validation(
            "notes.footer must contain the {sha256} placeholder".to_string(),
        ));
    }

    let files = [
        &lane.publish.checksum_file,
        &lane.publish.attestation_file,
        &lane.publish.summary_file,
    ];
    for file in files {
        if file.is_empty() || file.contains('/') || file.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "publish file name '{}' must be a plain file name",
                file
            )));
        }
    }
    if files[0] == files[1] || files[0] == files[2] || files[1] == files[2] {
        return Err(ConfigError::Validation(
            "publish file names must be distinct".to_string(),
        ));
    }

    Ok(())
}

/// Directories the pipeline empties before writing to them
fn validate_owned_dirs(lane: &LaneConfig) -> Result<(), ConfigError> {
    let owned = [
        ("build.output_dir", owned_dir("build.output_dir", &lane.build.output_dir)?),
        ("build.work_dir", owned_dir("build.work_dir", &lane.build.work_dir)?),
        ("publish.release_dir", owned_dir("publish.release_dir", &lane.publish.release_dir)?),
    ];

    for (i, (key, dir)) in owned.iter().enumerate() {
        for (other_key, other) in &owned[i + 1..] {
            if dir.starts_with(other) || other.starts_with(dir) {
                return Err(ConfigError::Validation(format!(
                    "{} '{}' and {} '{}' must not overlap",
                    key,
                    dir.display(),
                    other_key,
                    other.display()
                )));
            }
        }
    }

    // inputs living under a cleaned directory would be deleted
    let inputs = [("build.entry", &lane.build.entry), ("build.icon", &lane.build.icon)]
        .into_iter()
        .chain(lane.build.assets.iter().map(|a| ("build.assets", a)));
    for (input_key, input) in inputs {
        let Some(input_path) = relative_path(input) else {
            continue;
        };
        if let Some((key, _)) = owned.iter().find(|(_, dir)| input_path.starts_with(dir)) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' lies inside {}, which is emptied before every run",
                input_key, input, key
            )));
        }
    }

    Ok(())
}

fn owned_dir(key: &str, value: &str) -> Result<PathBuf, ConfigError> {
    match relative_path(value) {
        Some(path) if !path.as_os_str().is_empty() => Ok(path),
        Some(_) => Err(ConfigError::Validation(format!(
            "{} '{}' must name a subdirectory of the repository root",
            key, value
        ))),
        None => Err(ConfigError::Validation(format!(
            "{} '{}' must be a relative path inside the repository",
            key, value
        ))),
    }
}

/// `value` with `.` components dropped; `None` when it is absolute or
/// climbs out of the root
fn relative_path(value: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(value).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(path)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
