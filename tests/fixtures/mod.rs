//! Shared fixtures: a minimal application source tree and a CI identity

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use release_lane::{BuildIdentity, BuildRequest, LaneConfig};
use tempfile::TempDir;

pub const REVISION: &str = "9fceb02d0ae598e95dc970b74767f19372d61af8";

/// Source tree laid out for the default configuration
pub fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_sources(dir.path());
    dir
}

pub fn write_sources(root: &Path) {
    fs::write(root.join("main.py"), "import interface\ninterface.run()\n").unwrap();
    for asset in ["assets", "core", "interface", "utils"] {
        fs::create_dir_all(root.join(asset)).unwrap();
    }
    fs::write(root.join("assets/icon.ico"), [0u8, 0, 1, 0]).unwrap();
    fs::write(root.join("core/__init__.py"), "").unwrap();
}

pub fn config() -> LaneConfig {
    LaneConfig::default()
}

pub fn identity() -> BuildIdentity {
    BuildIdentity {
        revision: REVISION.to_string(),
        actor: "octocat".to_string(),
        repository: "acme/product".to_string(),
        run_id: "7311215402".to_string(),
        run_number: "42".to_string(),
        workflow: "Build and Release".to_string(),
        git_ref: "refs/heads/main".to_string(),
        server_url: "https://github.com".to_string(),
    }
}

pub fn request(tag: &str, name: &str, beta: bool, notes: &str) -> BuildRequest {
    let notes = if notes.is_empty() { None } else { Some(notes.to_string()) };
    BuildRequest::new(tag, name, beta, notes, identity()).unwrap()
}
