//! Layered configuration feeding a pipeline run

mod fixtures;

use std::fs;

use release_lane::config::{ConfigOrigin, REPO_CONFIG_PATH};
use release_lane::mock::{MockGateway, MockPackager, MockReleaseHost};
use release_lane::{EffectiveConfig, Pipeline};
use serde_json::json;

fn write_repo_config(root: &std::path::Path, contents: &str) -> std::path::PathBuf {
    let path = root.join(REPO_CONFIG_PATH);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_repo_config_renames_product_and_files() {
    let dir = fixtures::project();
    let path = write_repo_config(
        dir.path(),
        r#"
product = "DigTool"

[build]
assets = ["assets", "core"]

[publish]
checksum_file = "SHA256SUMS.txt"
"#,
    );

    let effective = EffectiveConfig::build(Some(&path), None).unwrap();
    assert_eq!(effective.sources[1].origin, ConfigOrigin::Repo);

    let packager = MockPackager::new();
    let gateway = MockGateway::new();
    let host = MockReleaseHost::new();
    let pipeline = Pipeline::new(effective.lane(), dir.path(), &packager, &gateway, &host);

    let outcome = pipeline
        .run(&fixtures::request("v0.9.1-rc.2", "RC 2", true, ""))
        .unwrap();

    assert_eq!(outcome.artifact.name(), "DigTool-0.9.1-rc.2");
    assert_eq!(packager.jobs()[0].assets.len(), 2);
    assert_eq!(
        host.releases()[0].file_names(),
        vec!["DigTool-0.9.1-rc.2.exe", "SHA256SUMS.txt", "build-attestation.json"]
    );
    assert!(host.releases()[0].body().contains("`SHA256SUMS.txt`"));
}

#[test]
fn test_cli_overrides_win_and_arrays_replace() {
    let dir = fixtures::project();
    let path = write_repo_config(
        dir.path(),
        r#"
[build]
assets = ["assets", "core", "interface"]

[vcs]
remote = "upstream"
"#,
    );

    let cli = json!({"build": {"assets": ["utils"]}, "vcs": {"remote": "mirror"}});
    let effective = EffectiveConfig::build(Some(&path), Some(cli)).unwrap();

    assert_eq!(effective.lane().build.assets, vec!["utils".to_string()]);
    assert_eq!(effective.lane().vcs.remote, "mirror");
    assert_eq!(effective.lane().build.entry, "main.py");
    assert_eq!(effective.sources.len(), 3);
}

#[test]
fn test_missing_asset_directory_fails_build() {
    let dir = fixtures::project();
    fs::remove_dir_all(dir.path().join("utils")).unwrap();
    let effective = EffectiveConfig::build(None, None).unwrap();

    let packager = MockPackager::new();
    let gateway = MockGateway::new();
    let host = MockReleaseHost::new();
    let pipeline = Pipeline::new(effective.lane(), dir.path(), &packager, &gateway, &host);

    let err = pipeline.run(&fixtures::request("v1.0", "Release 1.0", false, "")).unwrap_err();

    assert_eq!(err.exit_code(), 10);
    assert!(err.to_string().contains("asset directory"));
    assert!(packager.jobs().is_empty());
}

#[test]
fn test_invalid_repo_config_is_rejected() {
    let dir = fixtures::project();
    let path = write_repo_config(
        dir.path(),
        r#"
[publish]
checksum_file = "release.json"
attestation_file = "release.json"
"#,
    );

    let err = EffectiveConfig::build(Some(&path), None).unwrap_err();
    assert!(err.to_string().contains("distinct"));
}

#[test]
fn test_release_dir_at_repository_root_is_rejected() {
    let dir = fixtures::project();
    let path = write_repo_config(
        dir.path(),
        r#"
[publish]
release_dir = "."
"#,
    );

    let err = EffectiveConfig::build(Some(&path), None).unwrap_err();
    assert!(err.to_string().contains("publish.release_dir"));
    assert!(dir.path().join("main.py").is_file());
}

#[test]
fn test_named_config_that_does_not_exist_is_an_error() {
    let dir = fixtures::project();
    let named = dir.path().join(".release/lane.tml");

    let err = EffectiveConfig::load(dir.path(), Some(&named), None).unwrap_err();
    assert!(err.to_string().starts_with("IO error"));
}
