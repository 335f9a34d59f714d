use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crate::vcs::{TagError, TagGateway, TagLocation};

use super::failure::{FailureConfig, FailureInjector, MockOperation};

/// An annotated tag in the mock repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTag {
    pub message: String,
    pub revision: String,
}

#[derive(Debug, Default)]
struct Namespaces {
    local: BTreeMap<String, MockTag>,
    remote: BTreeSet<String>,
    calls: Vec<String>,
}

/// Tag gateway backed by in-memory tag namespaces
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<Namespaces>>,
    failures: Arc<Mutex<FailureInjector>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tag that already exists on the remote only
    pub fn with_remote_tag(self, tag: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.remote.insert(tag.to_string());
        }
        self
    }

    pub fn inject(&self, op: MockOperation, config: FailureConfig) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.inject(op, config);
        }
    }

    pub fn local_tag(&self, tag: &str) -> Option<MockTag> {
        self.state.lock().ok().and_then(|s| s.local.get(tag).cloned())
    }

    pub fn remote_tags(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.remote.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Operations invoked, as `op:tag`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    fn injected(&self, op: MockOperation, command: &str) -> Result<(), TagError> {
        let message = self.failures.lock().ok().and_then(|mut f| f.check(op));
        match message {
            Some(stderr) => Err(TagError::CommandFailed {
                command: command.to_string(),
                stderr,
            }),
            None => Ok(()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut Namespaces) -> T) -> Result<T, TagError> {
        let mut state = self.state.lock().map_err(|_| TagError::CommandFailed {
            command: "mock".to_string(),
            stderr: "state lock poisoned".to_string(),
        })?;
        Ok(f(&mut state))
    }
}

fn locate(state: &Namespaces, tag: &str) -> Option<TagLocation> {
    if state.local.contains_key(tag) {
        Some(TagLocation::Local)
    } else if state.remote.contains(tag) {
        Some(TagLocation::Remote)
    } else {
        None
    }
}

impl TagGateway for MockGateway {
    fn tag_exists(&self, tag: &str) -> Result<Option<TagLocation>, TagError> {
        self.injected(MockOperation::TagExists, "tag_exists")?;
        self.with_state(|state| {
            state.calls.push(format!("tag_exists:{}", tag));
            locate(state, tag)
        })
    }

    fn create_tag(&self, tag: &str, message: &str, revision: &str) -> Result<(), TagError> {
        self.injected(MockOperation::CreateTag, "create_tag")?;
        self.with_state(|state| {
            state.calls.push(format!("create_tag:{}", tag));
            if let Some(location) = locate(state, tag) {
                return Err(TagError::AlreadyExists {
                    tag: tag.to_string(),
                    location,
                });
            }
            state.local.insert(
                tag.to_string(),
                MockTag {
                    message: message.to_string(),
                    revision: revision.to_string(),
                },
            );
            Ok(())
        })?
    }

    fn push_tag(&self, tag: &str) -> Result<(), TagError> {
        self.injected(MockOperation::PushTag, "push_tag")?;
        self.with_state(|state| {
            state.calls.push(format!("push_tag:{}", tag));
            if !state.local.contains_key(tag) {
                return Err(TagError::NotCreated(tag.to_string()));
            }
            if !state.remote.insert(tag.to_string()) {
                return Err(TagError::AlreadyExists {
                    tag: tag.to_string(),
                    location: TagLocation::Remote,
                });
            }
            Ok(())
        })?
    }
}
