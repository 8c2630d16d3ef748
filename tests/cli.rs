//! Integration tests for the `isle-fragment` and `registry-cli` binaries.
//!
//! Verifies exit codes, operator-facing output and the registry side effects
//! of command-line runs.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

mod common;

fn fragment_cmd(dir: &Path, app: &str, domain: &str) -> assert_cmd::Command {
    let manifest = common::write_manifest(dir, app, common::SHOP_COMPOSE);
    let mut command = cargo_bin_cmd!("isle-fragment");
    command
        .env_remove("RUST_LOG")
        .arg("--app-name")
        .arg(app)
        .arg("--compose")
        .arg(manifest)
        .arg("--domain")
        .arg(domain)
        .arg("--output")
        .arg(dir.join(format!("{app}.conf")))
        .arg("--registry")
        .arg(common::registry_path(dir));
    command
}

#[test]
fn test_generates_fragment_and_registers() {
    let dir = tempfile::tempdir().unwrap();
    fragment_cmd(dir.path(), "shop", "shop.local")
        .assert()
        .success()
        .stdout(contains("Found 2 services for shop:"))
        .stdout(contains("  - web: www.shop.local:8080"))
        .stdout(contains("  - api: api.shop.local:3000 (mTLS)"))
        .stdout(contains("sudo isle agent reload"));

    let fragment = fs::read_to_string(dir.path().join("shop.conf")).unwrap();
    assert!(fragment.contains("server_name api.shop.local;"));

    let registry: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(common::registry_path(dir.path())).unwrap()).unwrap();
    assert_eq!(registry["domains"]["shop.local"], "shop");
    assert_eq!(registry["subdomains"]["www.shop.local"], "shop");
    assert_eq!(registry["apps"]["shop"]["services"], 2);
}

#[test]
fn test_conflict_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    fragment_cmd(dir.path(), "shop", "shop.local").assert().success();

    let output = fragment_cmd(dir.path(), "rival", "shop.local")
        .assert()
        .code(1)
        .stdout(contains("Found 2 services for rival:"))
        .stdout(contains("  - web: www.shop.local:8080"))
        .stderr(contains("CONFLICT ERRORS:"))
        .stderr(contains("Domain 'shop.local' is already claimed by app 'shop'"))
        .stderr(contains("Subdomain 'www.shop.local' is already claimed by app 'shop'"))
        .stderr(contains("Use --force to override conflict checking"))
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Domain 'shop.local' is already claimed").count(), 1);
    assert!(!dir.path().join("rival.conf").exists());
}

#[test]
fn test_corrupt_registry_warns_once() {
    let dir = tempfile::tempdir().unwrap();
    let registry = common::registry_path(dir.path());
    fs::create_dir_all(registry.parent().unwrap()).unwrap();
    fs::write(&registry, "{\"domains\": [").unwrap();

    let output = fragment_cmd(dir.path(), "shop", "shop.local")
        .assert()
        .success()
        .stderr(contains("registry was rebuilt from empty"))
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("could not parse registry").count(), 1);
    assert!(!stderr.contains("Could not parse registry"));
}

#[cfg(unix)]
#[test]
fn test_registry_mode_survives_a_run() {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    let dir = tempfile::tempdir().unwrap();
    fragment_cmd(dir.path(), "shop", "shop.local").assert().success();
    let registry = common::registry_path(dir.path());
    fs::set_permissions(&registry, fs::Permissions::from_mode(0o640)).unwrap();

    fragment_cmd(dir.path(), "shop", "shop.local").assert().success();

    let mode = |path: PathBuf| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(registry), 0o640);
    assert_eq!(mode(dir.path().join("shop.conf")), 0o644);
}

#[test]
fn test_force_proceeds_past_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    fragment_cmd(dir.path(), "shop", "shop.local").assert().success();

    fragment_cmd(dir.path(), "rival", "shop.local")
        .arg("--force")
        .assert()
        .success()
        .stderr(contains("Warning: Proceeding with --force flag"));

    cargo_bin_cmd!("registry-cli")
        .arg("--registry")
        .arg(common::registry_path(dir.path()))
        .args(["owner", "shop.local"])
        .assert()
        .success()
        .stdout("rival\n");
}

#[test]
fn test_check_conflicts_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    fragment_cmd(dir.path(), "shop", "shop.local").assert().success();

    fragment_cmd(dir.path(), "rival", "shop.local")
        .args(["--check-conflicts", "false"])
        .assert()
        .success();
}

#[test]
fn test_missing_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("isle-fragment")
        .args(["--app-name", "a", "--domain", "d.local"])
        .arg("--compose")
        .arg(dir.path().join("missing.yml"))
        .arg("--output")
        .arg(dir.path().join("a.conf"))
        .arg("--registry")
        .arg(common::registry_path(dir.path()))
        .assert()
        .code(1)
        .stderr(contains("manifest not found"));
}

#[test]
fn test_only_reserved_services_fails() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = common::write_manifest(
        dir.path(),
        "infra",
        "services:\n  mesh-proxy:\n    expose: [443]\n  isle-agent:\n    expose: [9000]\n",
    );
    cargo_bin_cmd!("isle-fragment")
        .args(["--app-name", "infra", "--domain", "infra.local"])
        .arg("--manifest")
        .arg(manifest)
        .arg("--output")
        .arg(dir.path().join("infra.conf"))
        .arg("--registry")
        .arg(common::registry_path(dir.path()))
        .assert()
        .code(1)
        .stderr(contains("no services found"));
}

#[cfg(unix)]
#[test]
fn test_failing_provider_surfaces_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("provider.sh");
    fs::write(&script, "#!/bin/sh\necho 'compose parse exploded' >&2\nexit 2\n").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fragment_cmd(dir.path(), "shop", "shop.local")
        .arg("--provider")
        .arg(&script)
        .assert()
        .code(1)
        .stderr(contains("compose parse exploded"));
}

#[test]
fn test_registry_cli_check_and_audit() {
    let dir = tempfile::tempdir().unwrap();
    fragment_cmd(dir.path(), "shop", "shop.local").assert().success();
    let registry = common::registry_path(dir.path());

    cargo_bin_cmd!("registry-cli")
        .arg("--registry")
        .arg(&registry)
        .args(["check", "--app-name", "other", "--domain", "other.local", "--subdomain", "www"])
        .assert()
        .success()
        .stdout(contains("No conflicts"));

    cargo_bin_cmd!("registry-cli")
        .arg("--registry")
        .arg(&registry)
        .args(["check", "--app-name", "other", "--domain", "shop.local", "--subdomain", "api"])
        .assert()
        .code(1)
        .stdout(contains("Subdomain 'api.shop.local' is already claimed by app 'shop'"));

    cargo_bin_cmd!("registry-cli")
        .arg("--registry")
        .arg(&registry)
        .arg("audit")
        .assert()
        .success()
        .stdout(contains("Registry is consistent"));
}

#[test]
fn test_registry_cli_show_empty() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("registry-cli")
        .arg("--registry")
        .arg(dir.path().join("none.json"))
        .arg("show")
        .assert()
        .success()
        .stdout(contains("\"domains\": {}"));
}
