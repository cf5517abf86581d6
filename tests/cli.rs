use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn upload_help_lists_flags() {
    let mut cmd = Command::cargo_bin("cmis-sync").expect("Binary exists");
    cmd.arg("upload").arg("--help");
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("--config")
                .and(predicate::str::contains("--overwrite"))
                .and(predicate::str::contains("--fail-fast")),
        );
}

#[test]
fn upload_fails_without_config_file() {
    let mut cmd = Command::cargo_bin("cmis-sync").expect("Binary exists");
    cmd.arg("upload").arg("--config").arg("/definitely/not/here.yaml");
    cmd.assert().failure();
}

#[test]
fn upload_fails_when_endpoint_unreachable() {
    let local = TempDir::new().unwrap();
    write(local.path().join("a.txt"), "hello").unwrap();

    let config = NamedTempFile::new().expect("Creating temp config file failed");
    // Port 9 (discard) is not expected to host a CMIS endpoint.
    write(
        config.path(),
        format!(
            "url: \"http://127.0.0.1:9/browser\"\nlocal_path: \"{}\"\ndest_path: \"/docs\"\n",
            local.path().display()
        ),
    )
    .expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("cmis-sync").expect("Binary exists");
    cmd.arg("upload")
        .arg("--config")
        .arg(config.path())
        .env("CMIS_USERNAME", "admin")
        .env("CMIS_PASSWORD", "admin");
    cmd.assert().failure();
}
