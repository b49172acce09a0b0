//! SSH credential staging for one invocation.
//!
//! A [CredentialSession] writes the private key to disk, starts a private
//! `ssh-agent`, loads the key into it, and exposes the agent's environment
//! so it can be handed to the backend explicitly. Dropping the session (or
//! calling [CredentialSession::close]) kills the agent and removes the key.

use crate::config::CredentialSettings;
use crate::error::{HgResourceError, Result};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const KEY_FILE_NAME: &str = "hg-resource-private-key";
const SSH_CLIENT_CONFIG: &str = "StrictHostKeyChecking no\nLogLevel quiet\n";

/// Parse `ssh-agent -s` output (`NAME=value; export NAME;` lines) into variables
pub fn parse_agent_output(output: &str) -> Vec<(String, String)> {
    let Ok(assignment) = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=([^;]*);") else {
        return Vec::new();
    };

    output
        .lines()
        .filter_map(|line| assignment.captures(line.trim()))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Write `content` to `path` so readers never see a partial file.
///
/// Creates the parent directory with `dir_mode` when missing, writes a
/// uniquely named sibling, applies `file_mode`, then renames it into place.
pub fn atomic_save(path: &Path, content: &[u8], file_mode: u32, dir_mode: u32) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            HgResourceError::resource(format!("Error creating directory {}: {}", dir.display(), e))
        })?;
        set_mode(dir, dir_mode)?;
    }

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(
            ".{}.",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("hg-resource")
        ))
        .tempfile_in(dir)
        .map_err(|e| {
            HgResourceError::resource(format!(
                "Error creating temporary file in {}: {}",
                dir.display(),
                e
            ))
        })?;

    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| {
            HgResourceError::resource(format!(
                "Error writing to file {}: {}",
                temp.path().display(),
                e
            ))
        })?;

    set_mode(temp.path(), file_mode)?;

    temp.persist(path).map_err(|e| {
        HgResourceError::resource(format!("Error renaming into {}: {}", path.display(), e))
    })?;

    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        HgResourceError::resource(format!(
            "Error changing permissions of {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Authenticated transport for the duration of one invocation
#[derive(Debug)]
pub struct CredentialSession {
    env: Vec<(String, String)>,
    key_file: PathBuf,
    closed: bool,
}

impl CredentialSession {
    /// Stage `private_key` and start an agent holding it
    pub fn start(private_key: &str, key_dir: &Path, settings: &CredentialSettings) -> Result<Self> {
        let key_file = key_dir.join(KEY_FILE_NAME);
        let mut key = private_key.to_string();
        if !key.ends_with('\n') {
            key.push('\n');
        }
        atomic_save(&key_file, key.as_bytes(), 0o600, 0o777).map_err(|e| {
            HgResourceError::resource(format!("Error writing private key to disk: {}", e))
        })?;

        // from here on, Drop cleans up whatever was staged
        let mut session = CredentialSession {
            env: Vec::new(),
            key_file,
            closed: false,
        };

        session.env = start_agent()?;
        session.add_key(settings)?;
        write_client_config()?;

        Ok(session)
    }

    /// Session over an already staged key file with no agent running
    #[cfg(test)]
    pub(crate) fn staged(key_file: PathBuf) -> Self {
        CredentialSession {
            env: Vec::new(),
            key_file,
            closed: false,
        }
    }

    /// Variables the backend process needs to reach the agent
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    fn agent_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn add_key(&self, settings: &CredentialSettings) -> Result<()> {
        let output = Command::new("ssh-add")
            .arg(&self.key_file)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("DISPLAY", "")
            .env("SSH_ASKPASS", &settings.askpass)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HgResourceError::resource(format!("Error running ssh-add: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HgResourceError::resource(format!(
                "Error running ssh-add: {}",
                if stderr.trim().is_empty() {
                    output.status.to_string()
                } else {
                    stderr.trim().to_string()
                }
            )));
        }

        Ok(())
    }

    /// Kill the agent and remove the staged key, reporting the first failure
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;

        if self.agent_var("SSH_AGENT_PID").is_some() {
            let killed = Command::new("ssh-agent")
                .arg("-k")
                .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();

            match killed {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    first_error = Some(HgResourceError::resource(format!(
                        "Error killing ssh-agent: {}",
                        status
                    )))
                }
                Err(e) => {
                    first_error = Some(HgResourceError::resource(format!(
                        "Error killing ssh-agent: {}",
                        e
                    )))
                }
            }
        }

        if self.key_file.exists() {
            if let Err(e) = fs::remove_file(&self.key_file) {
                first_error.get_or_insert_with(|| {
                    HgResourceError::resource(format!(
                        "Error removing {}: {}",
                        self.key_file.display(),
                        e
                    ))
                });
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for CredentialSession {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            crate::ui::display_error(&format!("Error in cleanup: {}", e));
        }
    }
}

fn start_agent() -> Result<Vec<(String, String)>> {
    let output = Command::new("ssh-agent")
        .arg("-s")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| HgResourceError::resource(format!("Error running ssh-agent: {}", e)))?;

    if !output.status.success() {
        return Err(HgResourceError::resource(format!(
            "Error running ssh-agent: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let env = parse_agent_output(&String::from_utf8_lossy(&output.stdout));
    if !env.iter().any(|(k, _)| k == "SSH_AUTH_SOCK") {
        return Err(HgResourceError::resource(
            "Error running ssh-agent: no SSH_AUTH_SOCK in its output",
        ));
    }

    Ok(env)
}

fn write_client_config() -> Result<()> {
    let home = dirs::home_dir().ok_or_else(|| {
        HgResourceError::resource("Unable to determine the home directory")
    })?;

    atomic_save(
        &home.join(".ssh").join("config"),
        SSH_CLIENT_CONFIG.as_bytes(),
        0o600,
        0o700,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_output() {
        let output = "SSH_AUTH_SOCK=/tmp/ssh-XXXXabcd/agent.4242; export SSH_AUTH_SOCK;\n\
                      SSH_AGENT_PID=4243; export SSH_AGENT_PID;\n\
                      echo Agent pid 4243;\n";

        assert_eq!(
            parse_agent_output(output),
            vec![
                (
                    "SSH_AUTH_SOCK".to_string(),
                    "/tmp/ssh-XXXXabcd/agent.4242".to_string()
                ),
                ("SSH_AGENT_PID".to_string(), "4243".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_agent_output_ignores_noise() {
        assert!(parse_agent_output("Agent pid 12\nnot an assignment\n").is_empty());
    }

    #[test]
    fn test_atomic_save_creates_dir_and_file() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("nested").join("key");

        atomic_save(&target, b"secret\n", 0o600, 0o700).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "secret\n");

        // no temporary siblings left behind
        let entries: Vec<_> = fs::read_dir(target.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_save_applies_modes() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(".ssh");
        let target = dir.join("config");

        atomic_save(&target, SSH_CLIENT_CONFIG.as_bytes(), 0o600, 0o700).unwrap();

        let file_mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn test_atomic_save_replaces_existing() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("key");

        atomic_save(&target, b"old", 0o600, 0o700).unwrap();
        atomic_save(&target, b"new", 0o600, 0o700).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_teardown_removes_key_file() {
        let root = tempfile::tempdir().unwrap();
        let key_file = root.path().join(KEY_FILE_NAME);
        fs::write(&key_file, "secret").unwrap();

        CredentialSession::staged(key_file.clone()).close().unwrap();
        assert!(!key_file.exists());
    }
}
