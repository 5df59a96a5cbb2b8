use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const TEST_KEY: &str = include_str!("../../../testdata/id_ed25519");

fn run(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_patchwatch"));
    cmd.current_dir(dir)
        .env_clear()
        .env("PATH", "/usr/local/bin:/usr/bin:/bin")
        .args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("run patchwatch")
}

#[test]
fn missing_settings_exit_2() {
    let dir = tempfile::tempdir().unwrap();

    let out = run(dir.path(), &["--no-mail"], &[]);

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ssh.username"), "stderr: {stderr}");
}

#[test]
fn smtp_required_when_mailing() {
    let dir = tempfile::tempdir().unwrap();

    let out = run(
        dir.path(),
        &[],
        &[
            ("SSH_USER", "patch"),
            ("SSH_KEY_PATH", "/nonexistent/id_ed25519"),
            ("EMAIL_FROM", "audit@example.com"),
            ("EMAIL_TO", "ops@example.com"),
        ],
    );

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("smtp.server"), "stderr: {stderr}");
}

#[test]
fn unparsable_server_list_exit_2() {
    let dir = tempfile::tempdir().unwrap();

    let out = run(
        dir.path(),
        &["--no-mail"],
        &[("YUM_SERVERS", "db1 db2")],
    );

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("YUM_SERVERS"), "stderr: {stderr}");
}

#[test]
fn missing_key_file_exit_2() {
    let dir = tempfile::tempdir().unwrap();

    let out = run(
        dir.path(),
        &["--no-mail"],
        &[
            ("SSH_USER", "patch"),
            ("SSH_KEY_PATH", "/nonexistent/id_ed25519"),
            ("YUM_SERVERS", r#"["db1"]"#),
        ],
    );

    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();

    let out = run(dir.path(), &["--config", "missing.toml", "--no-mail"], &[]);

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("missing.toml"), "stderr: {stderr}");
}

/// Config auditing `localhost` under both families with scripted commands
fn write_local_config(dir: &Path, extra: &str) -> PathBuf {
    let key = dir.join("id_ed25519");
    std::fs::write(&key, TEST_KEY).unwrap();
    std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o600)).unwrap();

    let config = dir.join("patchwatch.toml");
    std::fs::write(
        &config,
        format!(
            r#"
apt_servers = ["localhost"]
yum_servers = ["localhost"]

[ssh]
username = "patch"
key_path = "{}"

[commands]
apt = "printf 'Listing...\\nsystemd/stable 252.30-1 amd64 [upgradable from: 252.26-1]\\n'"
yum = "echo 'Error: Cannot find a valid baseurl' >&2; exit 1"
{extra}
"#,
            key.display()
        ),
    )
    .unwrap();
    config
}

#[test]
fn partial_failure_still_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_local_config(dir.path(), "");

    let out = run(
        dir.path(),
        &["--config", config.to_str().unwrap(), "--no-mail", "--print"],
        &[],
    );

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(0), "stderr: {stderr}");

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let updates = report["updates"].as_array().expect("updates array");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["update_item"]["package_name"], "systemd");
    assert_eq!(updates[0]["hostnames"][0], "localhost");

    let failures = report["failures"].as_array().expect("failures array");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["family"], "yum");
    assert_eq!(failures[0]["error"], "execution");

    let written = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .any(|e| e.file_name().to_string_lossy().starts_with("server_update_report"));
    assert!(written, "report file not written");
}

#[test]
fn mail_delivery_failure_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    // nothing listens on port 1
    let config = write_local_config(
        dir.path(),
        r#"
[email]
from_address = "audit@example.com"
to_address = "ops@example.com"

[smtp]
server = "127.0.0.1"
port = 1
username = "audit"
password = "secret"
"#,
    );

    let out = run(dir.path(), &["--config", config.to_str().unwrap()], &[]);

    assert_eq!(out.status.code(), Some(1));
}
