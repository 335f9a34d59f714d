use std::sync::{Arc, Mutex};

use crate::publish::{PublishError, PublishedRelease, ReleaseHost, ReleaseSpec};

use super::failure::{FailureConfig, FailureInjector, MockOperation};

/// Release host that keeps releases in memory, one per tag
#[derive(Debug, Clone)]
pub struct MockReleaseHost {
    base_url: String,
    releases: Arc<Mutex<Vec<ReleaseSpec>>>,
    failures: Arc<Mutex<FailureInjector>>,
}

impl Default for MockReleaseHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReleaseHost {
    pub fn new() -> Self {
        Self {
            base_url: "https://releases.example.test".to_string(),
            releases: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
        }
    }

    pub fn inject(&self, op: MockOperation, config: FailureConfig) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.inject(op, config);
        }
    }

    /// Releases created so far
    pub fn releases(&self) -> Vec<ReleaseSpec> {
        self.releases.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReleaseHost for MockReleaseHost {
    fn create_release(&self, spec: &ReleaseSpec) -> Result<PublishedRelease, PublishError> {
        let injected = self
            .failures
            .lock()
            .ok()
            .and_then(|mut f| f.check(MockOperation::CreateRelease));
        if let Some(message) = injected {
            return Err(PublishError::Rejected(message));
        }

        let mut releases = self
            .releases
            .lock()
            .map_err(|_| PublishError::Rejected("state lock poisoned".to_string()))?;
        if releases.iter().any(|r| r.tag() == spec.tag()) {
            return Err(PublishError::AlreadyExists {
                tag: spec.tag().to_string(),
            });
        }
        releases.push(spec.clone());

        Ok(PublishedRelease {
            tag: spec.tag().to_string(),
            url: format!("{}/{}", self.base_url, spec.tag()),
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

    fn spec(dir: &TempDir, tag: &str) -> ReleaseSpec {
        let files = ["a.exe", "checksums.txt", "build-attestation.json"]
            .iter()
            .map(|n| {
                let path = dir.path().join(n);
                fs::write(&path, b"x").unwrap();
                path
            })
            .collect();
        ReleaseSpec::new(tag, "title", "body", false, ReleaseFiles::new(files).unwrap())
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let dir = TempDir::new().unwrap();
        let host = MockReleaseHost::new();

        let release = host.create_release(&spec(&dir, "v1.0")).unwrap();
        assert_eq!(release.url, "https://releases.example.test/v1.0");

        let err = host.create_release(&spec(&dir, "v1.0")).unwrap_err();
        assert!(matches!(err, PublishError::AlreadyExists { .. }));
        assert_eq!(host.releases().len(), 1);
    }

    #[test]
    fn test_injected_failure_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let host = MockReleaseHost::new();
        host.inject(MockOperation::CreateRelease, FailureConfig::error("HTTP 502").with_fail_count(1));

        assert!(host.create_release(&spec(&dir, "v1.0")).is_err());
        assert!(host.releases().is_empty());
        assert!(host.create_release(&spec(&dir, "v1.0")).is_ok());
    }
}
