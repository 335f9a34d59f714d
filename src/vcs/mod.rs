//! Version control gateway
//!
//! Creates the annotated release tag and pushes it to the canonical remote.
//! Tags are never overwritten: an existing tag, local or remote, is an
//! error the operator has to resolve.

mod git;

pub use git::GitGateway;

use std::fmt;
use std::io;

use serde::Serialize;

/// Where an existing tag was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagLocation {
    Local,
    Remote,
}

impl fmt::Display for TagLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagLocation::Local => write!(f, "local repository"),
            TagLocation::Remote => write!(f, "remote"),
        }
    }
}

/// Tag errors
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag '{tag}' already exists in the {location}")]
    AlreadyExists { tag: String, location: TagLocation },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("tag '{0}' was never created")]
    NotCreated(String),
}

impl TagError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, TagError::AlreadyExists { .. })
    }
}

/// Capability: create and publish a release tag
pub trait TagGateway {
    /// Where `tag` already exists, if anywhere. Read-only.
    fn tag_exists(&self, tag: &str) -> Result<Option<TagLocation>, TagError>;

    /// Create an annotated tag at `revision`. Fails if the tag exists.
    fn create_tag(&self, tag: &str, message: &str, revision: &str) -> Result<(), TagError>;

    /// Push a previously created tag to the canonical remote
    fn push_tag(&self, tag: &str) -> Result<(), TagError>;
}

/// Annotated tag message for a release
pub fn tag_message(release_name: &str) -> String {
    format!("Release {}", release_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_message() {
        assert_eq!(tag_message("Beta Release 2.3"), "Release Beta Release 2.3");
    }

    #[test]
    fn test_conflict_display() {
        let err = TagError::AlreadyExists {
            tag: "v1.0".to_string(),
            location: TagLocation::Remote,
        };
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "tag 'v1.0' already exists in the remote");
    }
}
