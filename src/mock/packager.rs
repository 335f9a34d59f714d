use std::fs;
use std::sync::{Arc, Mutex};

use crate::builder::{BuildError, PackageJob, Packager};

use super::failure::{FailureConfig, FailureInjector, MockOperation};

/// Packager that writes fixed files instead of compiling anything
#[derive(Debug, Clone)]
pub struct MockPackager {
    /// File names to create; `{name}` expands to the artifact name
    outputs: Vec<String>,
    content: Vec<u8>,
    jobs: Arc<Mutex<Vec<PackageJob>>>,
    failures: Arc<Mutex<FailureInjector>>,
}

impl Default for MockPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPackager {
    /// Produces `{name}.exe`
    pub fn new() -> Self {
        Self {
            outputs: vec!["{name}.exe".to_string()],
            content: b"MZ\x90\x00mock executable".to_vec(),
            jobs: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
        }
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    pub fn inject(&self, op: MockOperation, config: FailureConfig) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.inject(op, config);
        }
    }

    /// Jobs received so far
    pub fn jobs(&self) -> Vec<PackageJob> {
        self.jobs.lock().map(|j| j.clone()).unwrap_or_default()
    }
}

impl Packager for MockPackager {
    fn package(&self, job: &PackageJob) -> Result<(), BuildError> {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job.clone());
        }

        let injected = self
            .failures
            .lock()
            .ok()
            .and_then(|mut f| f.check(MockOperation::Package));
        if let Some(message) = injected {
            return Err(BuildError::PackagerFailed {
                status: "exit status: 1".to_string(),
                stderr: message,
            });
        }

        for output in &self.outputs {
            let path = job.output_dir.join(output.replace("{name}", &job.name));
            fs::write(&path, &self.content).map_err(|source| BuildError::Workspace {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
