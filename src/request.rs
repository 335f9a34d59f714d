//! Build requests
//!
//! A [`BuildRequest`] is created once per pipeline invocation and never
//! mutated afterwards. The provenance fields come from the CI environment
//! when available, with CLI overrides layered on top.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Release tags must look like a version identifier, optionally `v`-prefixed
pub const TAG_PATTERN: &str = r"^[vV]?[0-9]+(\.[0-9]+)*([-+][0-9A-Za-z.-]+)?$";

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(TAG_PATTERN).expect("TAG_PATTERN is a valid regex"))
}

/// Errors for build request construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("release tag '{0}' is not a version identifier (expected e.g. v1.2.3 or v2.3-beta)")]
    InvalidTag(String),

    #[error("release name must not be empty")]
    EmptyName,

    #[error("missing build identity field: {0}")]
    MissingIdentity(&'static str),
}

/// Identity of the build invocation, recorded in the attestation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIdentity {
    /// Source revision (commit SHA) being released
    pub revision: String,
    pub actor: String,
    /// `owner/name`
    pub repository: String,
    pub run_id: String,
    pub run_number: String,
    pub workflow: String,
    pub git_ref: String,
    pub server_url: String,
}

impl BuildIdentity {
    /// Read identity from the GitHub Actions environment
    pub fn from_env() -> PartialIdentity {
        let vars: HashMap<String, String> = std::env::vars().collect();
        PartialIdentity::from_vars(&vars)
    }
}

/// Identity fields as discovered; any may still be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialIdentity {
    pub revision: Option<String>,
    pub actor: Option<String>,
    pub repository: Option<String>,
    pub run_id: Option<String>,
    pub run_number: Option<String>,
    pub workflow: Option<String>,
    pub git_ref: Option<String>,
    pub server_url: Option<String>,
}

impl PartialIdentity {
    /// Pick identity fields out of an environment map
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            revision: get("GITHUB_SHA"),
            actor: get("GITHUB_ACTOR"),
            repository: get("GITHUB_REPOSITORY"),
            run_id: get("GITHUB_RUN_ID"),
            run_number: get("GITHUB_RUN_NUMBER"),
            workflow: get("GITHUB_WORKFLOW"),
            git_ref: get("GITHUB_REF"),
            server_url: get("GITHUB_SERVER_URL"),
        }
    }

    /// Fields set in `overlay` win
    pub fn overlay(self, overlay: PartialIdentity) -> Self {
        Self {
            revision: overlay.revision.or(self.revision),
            actor: overlay.actor.or(self.actor),
            repository: overlay.repository.or(self.repository),
            run_id: overlay.run_id.or(self.run_id),
            run_number: overlay.run_number.or(self.run_number),
            workflow: overlay.workflow.or(self.workflow),
            git_ref: overlay.git_ref.or(self.git_ref),
            server_url: overlay.server_url.or(self.server_url),
        }
    }

    /// Fill local-run defaults and require the fields that have none.
    ///
    /// Revision and repository are required. A missing run id becomes
    /// `local-<ulid>`.
    pub fn complete(self, default_workflow: &str, default_server_url: &str) -> Result<BuildIdentity, RequestError> {
        let revision = self.revision.ok_or(RequestError::MissingIdentity("revision"))?;
        let repository = self.repository.ok_or(RequestError::MissingIdentity("repository"))?;
        let run_id = self.run_id.unwrap_or_else(generate_local_run_id);

        Ok(BuildIdentity {
            revision,
            actor: self.actor.unwrap_or_else(|| "local".to_string()),
            repository,
            run_number: self.run_number.unwrap_or_else(|| "0".to_string()),
            run_id,
            workflow: self.workflow.unwrap_or_else(|| default_workflow.to_string()),
            git_ref: self.git_ref.unwrap_or_default(),
            server_url: self.server_url.unwrap_or_else(|| default_server_url.to_string()),
        })
    }
}

fn generate_local_run_id() -> String {
    format!("local-{}", ulid::Ulid::new().to_string().to_lowercase())
}

/// Immutable input to one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    tag: String,
    name: String,
    beta: bool,
    notes: String,
    identity: BuildIdentity,
}

impl BuildRequest {
    /// Validate and construct a request
    pub fn new(
        tag: impl Into<String>,
        name: impl Into<String>,
        beta: bool,
        notes: Option<String>,
        identity: BuildIdentity,
    ) -> Result<Self, RequestError> {
        let tag = tag.into();
        let name = name.into();

        if !is_valid_tag(&tag) {
            return Err(RequestError::InvalidTag(tag));
        }
        if name.trim().is_empty() {
            return Err(RequestError::EmptyName);
        }

        Ok(Self {
            tag,
            name,
            beta,
            notes: notes.unwrap_or_default(),
            identity,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_beta(&self) -> bool {
        self.beta
    }

    /// Operator-supplied notes, empty when none were given
    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn identity(&self) -> &BuildIdentity {
        &self.identity
    }
}

/// Check a tag against [`TAG_PATTERN`]
pub fn is_valid_tag(tag: &str) -> bool {
    tag_regex().is_match(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> BuildIdentity {
        BuildIdentity {
            revision: "0123abcd".to_string(),
            actor: "octocat".to_string(),
            repository: "acme/product".to_string(),
            run_id: "1001".to_string(),
            run_number: "7".to_string(),
            workflow: "Build and Release".to_string(),
            git_ref: "refs/heads/main".to_string(),
            server_url: "https://github.com".to_string(),
        }
    }

    #[test]
    fn test_valid_tags() {
        for tag in ["v1", "v2.3", "v2.3-beta", "1.0.0", "V10.2.1-rc.1", "v1.0.0+build.5"] {
            assert!(is_valid_tag(tag), "{} should be valid", tag);
        }
    }

    #[test]
    fn test_invalid_tags() {
        for tag in ["", "v", "release", "v1..2", "v1.2 beta", "vv1.0", "1.0-", "../v1"] {
            assert!(!is_valid_tag(tag), "{} should be invalid", tag);
        }
    }

    #[test]
    fn test_request_defaults_notes_to_empty() {
        let request = BuildRequest::new("v2.3-beta", "Beta Release 2.3", true, None, identity()).unwrap();
        assert_eq!(request.tag(), "v2.3-beta");
        assert_eq!(request.notes(), "");
        assert!(request.is_beta());
    }

    #[test]
    fn test_request_rejects_bad_tag_and_empty_name() {
        assert_eq!(
            BuildRequest::new("latest", "x", false, None, identity()).unwrap_err(),
            RequestError::InvalidTag("latest".to_string())
        );
        assert_eq!(
            BuildRequest::new("v1.0", "   ", false, None, identity()).unwrap_err(),
            RequestError::EmptyName
        );
    }

    #[test]
    fn test_identity_from_vars_and_overlay() {
        let mut vars = HashMap::new();
        vars.insert("GITHUB_SHA".to_string(), "abc".to_string());
        vars.insert("GITHUB_REPOSITORY".to_string(), "acme/product".to_string());
        vars.insert("GITHUB_RUN_ID".to_string(), "99".to_string());
        vars.insert("GITHUB_ACTOR".to_string(), "  ".to_string());

        let env = PartialIdentity::from_vars(&vars);
        assert_eq!(env.actor, None);

        let cli = PartialIdentity {
            actor: Some("release-bot".to_string()),
            ..Default::default()
        };
        let identity = env.overlay(cli).complete("Build and Release", "https://github.com").unwrap();

        assert_eq!(identity.revision, "abc");
        assert_eq!(identity.actor, "release-bot");
        assert_eq!(identity.run_id, "99");
        assert_eq!(identity.workflow, "Build and Release");
    }

    #[test]
    fn test_complete_generates_local_run_id() {
        let partial = PartialIdentity {
            revision: Some("abc".to_string()),
            repository: Some("acme/product".to_string()),
            ..Default::default()
        };
        let identity = partial.complete("wf", "https://github.com").unwrap();
        assert!(identity.run_id.starts_with("local-"));
        assert_eq!(identity.run_id.len(), "local-".len() + 26);
    }

    #[test]
    fn test_complete_requires_revision() {
        let partial = PartialIdentity {
            repository: Some("acme/product".to_string()),
            ..Default::default()
        };
        assert_eq!(
            partial.complete("wf", "https://github.com").unwrap_err(),
            RequestError::MissingIdentity("revision")
        );
    }
}
