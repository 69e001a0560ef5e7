//! End-to-end tests for the `provisioner` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "PROVISIONER_CONFIG",
    "PROVISIONER_HOST",
    "PROVISIONER_ENV",
    "PROVISIONER_API_KEY",
    "PROVISIONER_DRY_RUN",
    "KEYCLOAK_URL",
    "KEYCLOAK_ADMIN",
    "KEYCLOAK_ADMIN_PASSWORD",
    "AZURE_KEYVAULT_NAME",
    "AZURE_KEYVAULT_URL",
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "RUST_LOG",
];

/// Binary with an empty home directory and no inherited settings.
fn provisioner(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("provisioner").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home.path()).env("NO_COLOR", "1");
    cmd
}

#[test]
fn config_masks_api_key() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .arg("config")
        .env("PROVISIONER_API_KEY", "super-secret-key")
        .env("PROVISIONER_ENV", "staging")
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("staging"))
        .stdout(predicate::str::contains("super-secret-key").not());
}

#[test]
fn config_reports_missing_api_key() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT SET"))
        .stdout(predicate::str::contains("localhost"));
}

#[test]
fn declined_delete_exits_with_failure() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["delete", "server", "web-01"])
        .write_stdin("n\n")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("IRREVERSIBLE"))
        .stdout(predicate::str::contains("Operation cancelled"))
        .stdout(predicate::str::contains("Successfully").not());
}

#[test]
fn empty_answer_defaults_to_no() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["create", "database", "orders"])
        .write_stdin("\n")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Operation cancelled"));
}

#[test]
fn confirmed_create_succeeds() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["create", "server", "web-01", "--size", "large"])
        .env("PROVISIONER_HOST", "api.example.com")
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Size:   large"))
        .stdout(predicate::str::contains("Successfully created server 'web-01'"))
        .stdout(predicate::str::contains("Provisioned on api.example.com (development)"));
}

#[test]
fn forced_dry_run_changes_nothing() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["create", "bucket", "assets", "--public", "--force"])
        .env("PROVISIONER_DRY_RUN", "TRUE")
        .assert()
        .success()
        .stdout(predicate::str::contains("Visibility: public"))
        .stdout(predicate::str::contains("DRY RUN - No changes made"))
        .stdout(predicate::str::contains("Successfully").not());
}

#[test]
fn dry_run_only_accepts_true() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["update", "database", "orders", "--storage", "50", "-f"])
        .env("PROVISIONER_DRY_RUN", "yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("New Storage: 50 GB"))
        .stdout(predicate::str::contains("Successfully updated database 'orders'"));
}

#[test]
fn config_file_supplies_settings() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".provisioner");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("provisioner.toml"),
        "[provisioner]\nhost = \"file-host\"\nenvironment = \"production\"\n",
    )
    .unwrap();

    provisioner(&home)
        .args(["delete", "bucket", "logs", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed from file-host (production)"));

    provisioner(&home)
        .args(["delete", "bucket", "logs", "--force"])
        .env("PROVISIONER_HOST", "env-host")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed from env-host (production)"));
}

#[test]
fn keycloak_dry_run_prints_plan_without_connecting() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["keycloak", "provision", "--with-test-user", "--dry-run"])
        .env("KEYCLOAK_URL", "http://127.0.0.1:9")
        .assert()
        .success()
        .stdout(predicate::str::contains("realm  calendar"))
        .stdout(predicate::str::contains("role   owner"))
        .stdout(predicate::str::contains("grant  testuser -> owner"))
        .stdout(predicate::str::contains("DRY RUN"));
}

#[test]
fn keycloak_unreachable_server_fails() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["keycloak", "provision"])
        .env("KEYCLOAK_URL", "http://127.0.0.1:9")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed"));
}

#[test]
fn partial_azure_credentials_are_rejected() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["vault", "exists", "db-password"])
        .env("AZURE_TENANT_ID", "tenant")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("incomplete service principal credentials"));
}

#[test]
fn missing_explicit_config_file_fails() {
    let home = TempDir::new().unwrap();
    provisioner(&home)
        .args(["--config", "/nonexistent/provisioner.toml", "config"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration file not found"));
}
