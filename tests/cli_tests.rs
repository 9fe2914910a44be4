//! CLI tests for the fixazurerm binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const ARM_VARS: &[&str] = &[
    "ARM_SUBSCRIPTION_ID",
    "ARM_CLIENT_ID",
    "ARM_CLIENT_SECRET",
    "ARM_TENANT_ID",
    "ARM_ACCESS_KEY",
    "ARM_ENDPOINT",
    "ARM_AUTHORITY_URL",
    "FIXAZURERM_CONFIG",
    "RUST_LOG",
];

/// A command with no Azure credentials in its environment.
fn fixazurerm_cmd() -> Command {
    let mut cmd = Command::cargo_bin("fixazurerm").unwrap();
    for var in ARM_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help() {
    fixazurerm_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("configure"))
        .stdout(predicate::str::contains("catalog"));
}

#[test]
fn test_version() {
    fixazurerm_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_catalog_lists_namespaces() {
    fixazurerm_cmd()
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("Microsoft.Network"))
        .stdout(predicate::str::contains("Microsoft.KeyVault"))
        .stdout(predicate::str::contains("Microsoft.EventHub"))
        .stdout(predicate::str::contains("Microsoft.Compute").not());
}

#[test]
fn test_validate_without_credentials_lists_every_violation() {
    fixazurerm_cmd()
        .arg("validate")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("4 errors occurred"))
        .stderr(predicate::str::contains("Subscription ID must be configured"))
        .stderr(predicate::str::contains("Tenant ID must be configured"));
}

#[test]
fn test_validate_with_environment_credentials() {
    fixazurerm_cmd()
        .arg("validate")
        .env("ARM_SUBSCRIPTION_ID", "s")
        .env("ARM_CLIENT_ID", "c")
        .env("ARM_CLIENT_SECRET", "x")
        .env("ARM_TENANT_ID", "t")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_with_config_file_missing_secret() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"subscription_id = "s"
client_id = "c"
tenant_id = "t""#
    )
    .unwrap();

    fixazurerm_cmd()
        .arg("validate")
        .arg("-c")
        .arg(file.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("1 error occurred"))
        .stderr(predicate::str::contains("Client Secret must be configured"));
}

#[test]
fn test_configure_without_credentials_fails_before_network() {
    fixazurerm_cmd()
        .arg("configure")
        .env("ARM_AUTHORITY_URL", "http://127.0.0.1:1")
        .env("ARM_ENDPOINT", "http://127.0.0.1:1")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("4 errors occurred"));
}

#[test]
fn test_missing_config_file() {
    fixazurerm_cmd()
        .args(["validate", "-c", "/nonexistent/provider.toml"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_invalid_log_format() {
    fixazurerm_cmd()
        .args(["catalog", "--log-format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("xml"));
}
