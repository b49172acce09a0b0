// tests/config_test.rs
use hg_resource::config::{load_settings, Settings};
use hg_resource::HgResourceError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[backend]
binary = "/usr/local/bin/hg"

[publish]
max_attempts = 4
keep_workspace = true
workspace_dir = "/var/tmp/hg-out"

[credentials]
askpass = "/usr/libexec/askpass"
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let settings = load_settings(Some(temp_file.path())).unwrap();
    assert_eq!(settings.backend.binary, "/usr/local/bin/hg");
    assert_eq!(settings.publish.max_attempts, 4);
    assert!(settings.publish.keep_workspace);
    assert_eq!(settings.workspace_root(), PathBuf::from("/var/tmp/hg-out"));
    assert_eq!(
        settings.credentials.askpass,
        PathBuf::from("/usr/libexec/askpass")
    );
}

#[test]
fn test_empty_file_gives_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    let settings = load_settings(Some(temp_file.path())).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_invalid_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[publish\nmax_attempts = ").unwrap();
    temp_file.flush().unwrap();

    let result = load_settings(Some(temp_file.path()));
    assert!(matches!(result, Err(HgResourceError::Toml(_))));
}

#[test]
fn test_zero_attempts_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[publish]\nmax_attempts = 0\n").unwrap();
    temp_file.flush().unwrap();

    let result = load_settings(Some(temp_file.path()));
    assert!(matches!(result, Err(HgResourceError::Config(_))));
}

#[test]
fn test_missing_explicit_file() {
    let result = load_settings(Some(std::path::Path::new("/nonexistent/hgresource.toml")));
    assert!(matches!(result, Err(HgResourceError::Config(_))));
}
