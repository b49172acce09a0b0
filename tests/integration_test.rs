// tests/integration_test.rs
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn hgresource(args: &[&str], stdin: &str, envs: &[(&str, &str)]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hgresource"))
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    // the process may exit before reading stdin, e.g. on usage errors
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

#[test]
fn test_hgresource_help() {
    let output = hgresource(&["--help"], "", &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("hgresource"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("out"));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    let output = hgresource(&[], "", &[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_in_without_destination_is_usage_error() {
    let output = hgresource(&["in"], "{}", &[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_check_without_uri_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("hgresource.toml");
    std::fs::write(&settings, "").unwrap();

    let output = hgresource(
        &["--config", settings.to_str().unwrap(), "check"],
        r#"{"source": {}}"#,
        &[],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Repository URI must be provided"));
}

#[test]
fn test_malformed_input_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("hgresource.toml");
    std::fs::write(&settings, "").unwrap();

    let output = hgresource(
        &["--config", settings.to_str().unwrap(), "check"],
        "{source:",
        &[],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Error parsing input JSON"));
}

#[test]
fn test_backend_failure_echoes_output() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("hgresource.toml");
    // `false` exits 1 without output, standing in for a failing hg
    std::fs::write(
        &settings,
        format!(
            "[backend]\nbinary = \"false\"\n[check]\ncache_dir = \"{}\"\n",
            dir.path().join("cache").display()
        ),
    )
    .unwrap();

    let output = hgresource(
        &["--config", settings.to_str().unwrap(), "check"],
        r#"{"source": {"uri": "/nonexistent/repo"}}"#,
        &[],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8(output.stderr).unwrap().contains("ERROR"));
}

#[test]
fn test_error_reported_on_one_line_without_repeated_cause() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("hgresource.toml");
    std::fs::write(&settings, "[publish\nmax_attempts = ").unwrap();

    let output = hgresource(
        &["--config", settings.to_str().unwrap(), "check"],
        r#"{"source": {"uri": "/srv/hg/repo"}}"#,
        &[],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.matches("ERROR").count(), 1, "got: {}", stderr);
    assert_eq!(
        stderr.matches("TOML parse error").count(),
        1,
        "cause printed more than once: {}",
        stderr
    );
}
