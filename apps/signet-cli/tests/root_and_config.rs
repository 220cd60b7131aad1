use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn bin(workdir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("signet").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("SIGNET_BROKER_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn root_without_command_prints_about_and_help() {
    let tmp = tempdir().unwrap();
    bin(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "A command line interface for the contract broker",
        ))
        .stdout(predicate::str::contains("deploy-guard"));
}

#[test]
fn config_file_supplies_broker_url_and_flags() {
    let tmp = tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/deploy")
            .query_param("providerName", "user_service")
            .query_param("environmentName", "staging");
        then.status(200).json_body(json!({"status": true}));
    });
    fs::write(
        tmp.path().join(".signetrc.yaml"),
        format!(
            "broker-url: {}\ndeploy-guard:\n  name: user_service\n  environment: production\n",
            server.base_url()
        ),
    )
    .unwrap();

    bin(tmp.path())
        .args(["deploy-guard", "--version", "v1", "--environment", "staging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("of user_service is compatible"));
    mock.assert();
}

#[test]
fn ignore_config_skips_the_file() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(".signetrc.yaml"),
        "broker-url: http://127.0.0.1:9\nregister-env:\n  environment: production\n",
    )
    .unwrap();

    bin(tmp.path())
        .args(["register-env", "--ignore-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No --broker-url was provided."));
}

#[test]
fn malformed_config_is_reported() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join(".signetrc.yaml"), "broker-url: [oops").unwrap();
    bin(tmp.path())
        .args(["register-env", "-e", "production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".signetrc.yaml"));
}

#[test]
fn test_command_requires_provider_url() {
    let tmp = tempdir().unwrap();
    bin(tmp.path())
        .args(["test", "--name", "orders", "--version", "v1", "-u", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "No --provider-url was provided. This is a required flag.",
        ));
}

#[test]
fn proxy_requires_path() {
    let tmp = tempdir().unwrap();
    bin(tmp.path())
        .args(["proxy", "--port", "3000", "--target", "http://localhost:4000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No --path was provided. This is a required flag."));
}
