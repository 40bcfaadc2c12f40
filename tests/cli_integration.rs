//! CLI tests against the built binary. No model weights are installed, so
//! every run exercises the `not_loaded` service state.

#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Command isolated from the user's config, weights and API key.
fn solarscan(dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("solarscan"));
    cmd.env_remove("SOLAR_API_KEY")
        .env_remove("RUST_LOG")
        .env_remove("SOLARSCAN_JOBS")
        .arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--weights")
        .arg(dir.join("missing.onnx"))
        .arg("--base-weights")
        .arg(dir.join("missing_base.onnx"))
        .arg("--artifacts-dir")
        .arg(dir.join("artifacts"))
        .arg("--cpu")
        .arg("--quiet");
    cmd
}

#[test]
fn test_health_without_model() {
    let dir = TempDir::new().unwrap();
    solarscan(dir.path())
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "ok""#))
        .stdout(predicate::str::contains(r#""device": "cpu""#))
        .stdout(predicate::str::contains(r#""model": "not_loaded""#));

    assert!(dir.path().join("artifacts").is_dir());
}

#[test]
fn test_infer_without_model_is_service_unavailable() {
    let dir = TempDir::new().unwrap();
    solarscan(dir.path())
        .args(["infer", "--lat", "12.9716", "--lon", "77.5946"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": 503"#))
        .stdout(predicate::str::contains(r#""error": "model_not_loaded""#))
        .stderr(predicate::str::contains("request failed with status 503"));
}

#[test]
fn test_batch_without_model_is_service_unavailable() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("batch.csv");
    std::fs::write(&input, "id,lat,lon\nh1,12.9716,77.5946\n").unwrap();

    solarscan(dir.path())
        .arg("batch")
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": 503"#));
}

#[test]
fn test_infer_rejects_invalid_latitude() {
    let dir = TempDir::new().unwrap();
    solarscan(dir.path())
        .args(["infer", "--lat", "999", "--lon", "77.5946"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("latitude must be between"));
}

#[test]
fn test_imagery_fallback_writes_png() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("fallback.png");

    solarscan(dir.path())
        .args(["imagery", "fallback", "--size", "320x200", "-o"])
        .arg(&output)
        .assert()
        .success();

    let raster = solarscan::imagery::Raster::open(&output).unwrap();
    assert_eq!((raster.width(), raster.height()), (320, 200));
}

#[test]
fn test_imagery_check_without_key_fails() {
    let dir = TempDir::new().unwrap();
    solarscan(dir.path())
        .args(["imagery", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""valid": false"#))
        .stdout(predicate::str::contains("no API key configured"));
}

#[test]
fn test_report_without_model_fails() {
    let dir = TempDir::new().unwrap();
    solarscan(dir.path())
        .arg("report")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("model not loaded"));
}

#[test]
fn test_config_init_and_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    solarscan(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    solarscan(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(config.is_file());

    solarscan(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[thresholds]"));
}
