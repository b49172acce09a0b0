use crate::domain::Repository;
use crate::error::{HgResourceError, Result};
use crate::hg::VersionControlBackend;
use std::process::{Command, Stdio};

/// Commands that reach the network and therefore accept `--insecure`
const INSECURE_ELIGIBLE: [&str; 3] = ["clone", "pull", "push"];

/// Backend that runs the `hg` executable once per operation
#[derive(Debug, Clone)]
pub struct HgCommand {
    binary: String,
    env: Vec<(String, String)>,
}

impl HgCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        HgCommand {
            binary: binary.into(),
            env: Vec::new(),
        }
    }

    /// Extra environment for every invocation, e.g. a credential session's agent socket
    pub fn with_env(mut self, env: &[(String, String)]) -> Self {
        self.env.extend(env.iter().cloned());
        self
    }

    /// Full argument list for one invocation
    pub fn arguments(&self, repo: &Repository, command: &str, args: &[&str]) -> Vec<String> {
        let mut hg_args = Vec::with_capacity(args.len() + 2);
        hg_args.push(command.to_string());

        if repo.insecure && INSECURE_ELIGIBLE.contains(&command) {
            hg_args.push("--insecure".to_string());
        }

        hg_args.extend(args.iter().map(|arg| arg.to_string()));
        hg_args
    }

    /// Run one command and capture stdout and stderr together.
    ///
    /// `context` becomes the error message when the command fails.
    fn run(&self, repo: &Repository, command: &str, args: &[&str], context: &str) -> Result<String> {
        let hg_args = self.arguments(repo, command, args);

        let output = Command::new(&self.binary)
            .args(&hg_args)
            .env("HGPLAIN", "1")
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                HgResourceError::backend(
                    format!("{}: failed to run {}: {}", context, self.binary, e),
                    String::new(),
                )
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(HgResourceError::backend(
                format!(
                    "{} ({} {} exited with {})",
                    context,
                    self.binary,
                    command,
                    output
                        .status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "a signal".to_string())
                ),
                combined,
            ))
        }
    }

    fn cwd(repo: &Repository) -> String {
        repo.path.display().to_string()
    }
}

impl VersionControlBackend for HgCommand {
    fn clone_or_update(&self, repo: &Repository, source_uri: &str) -> Result<String> {
        let path = Self::cwd(repo);

        if !repo.is_checked_out() {
            return self.run(
                repo,
                "clone",
                &["-q", "--branch", &repo.branch, source_uri, &path],
                &format!("Error cloning repository from {}", source_uri),
            );
        }

        let mut output = self.run(
            repo,
            "pull",
            &["-q", "--cwd", &path],
            "Error pulling changes from repository",
        )?;

        output.push_str(&self.run(
            repo,
            "checkout",
            &["-q", "--cwd", &path, "--clean", "--rev", &repo.branch],
            "Error updating working directory to tip",
        )?);

        Ok(output)
    }

    fn clone_at_revision(
        &self,
        repo: &Repository,
        source_uri: &str,
        commit_id: &str,
    ) -> Result<String> {
        self.run(
            repo,
            "clone",
            &["-q", "--rev", commit_id, source_uri, &Self::cwd(repo)],
            &format!("Error cloning repository {}@{}", source_uri, commit_id),
        )
    }

    fn checkout(&self, repo: &Repository, commit_id: &str) -> Result<String> {
        self.run(
            repo,
            "checkout",
            &["-q", "--cwd", &Self::cwd(repo), "--clean", "--rev", commit_id],
            &format!("Error checking out {}", commit_id),
        )
    }

    fn purge_untracked(&self, repo: &Repository) -> Result<String> {
        self.run(
            repo,
            "purge",
            &["--config", "extensions.purge=", "--cwd", &Self::cwd(repo), "--all"],
            "Error purging repository",
        )
    }

    fn set_mutable_phase(&self, repo: &Repository) -> Result<String> {
        self.run(
            repo,
            "phase",
            &["--cwd", &Self::cwd(repo), "--force", "--draft"],
            "Error setting repository phase to draft",
        )
    }

    fn tag(&self, repo: &Repository, name: &str) -> Result<String> {
        // --force moves a tag left behind by an earlier, rejected attempt
        self.run(
            repo,
            "tag",
            &["--cwd", &Self::cwd(repo), "--force", name],
            &format!("Error tagging current commit as {}", name),
        )
    }

    fn pull_with_rebase(&self, repo: &Repository, dest_uri: &str, branch: &str) -> Result<String> {
        let push_target = format!("paths.push-target={}", dest_uri);
        self.run(
            repo,
            "pull",
            &[
                "-q",
                "--cwd",
                &Self::cwd(repo),
                "--config",
                "extensions.rebase=",
                "--config",
                &push_target,
                "--rebase",
                "--branch",
                branch,
                "push-target",
            ],
            &format!("Error pulling/rebasing from {}", dest_uri),
        )
    }

    fn push(&self, repo: &Repository, dest_uri: &str, branch: &str) -> Result<String> {
        let push_target = format!("paths.push-target={}", dest_uri);
        self.run(
            repo,
            "push",
            &[
                "--cwd",
                &Self::cwd(repo),
                "--config",
                &push_target,
                "--branch",
                branch,
                "push-target",
            ],
            &format!("Error pushing to {}", dest_uri),
        )
    }

    fn query(&self, repo: &Repository, revset: &str, template: &str) -> Result<String> {
        self.run(
            repo,
            "log",
            &["--cwd", &Self::cwd(repo), "--rev", revset, "--template", template],
            &format!("Error querying revisions {}", revset),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insecure_only_for_network_commands() {
        let hg = HgCommand::new("hg");
        let repo = Repository::new("/tmp/repo", "default").with_insecure(true);

        assert_eq!(
            hg.arguments(&repo, "pull", &["-q"]),
            vec!["pull", "--insecure", "-q"]
        );
        assert_eq!(
            hg.arguments(&repo, "log", &["--rev", "."]),
            vec!["log", "--rev", "."]
        );
    }

    #[test]
    fn test_secure_by_default() {
        let hg = HgCommand::new("hg");
        let repo = Repository::new("/tmp/repo", "default");

        assert_eq!(
            hg.arguments(&repo, "clone", &["-q", "src", "dst"]),
            vec!["clone", "-q", "src", "dst"]
        );
    }

    #[test]
    fn test_missing_binary_is_backend_error() {
        let hg = HgCommand::new("/nonexistent/bin/hg");
        let repo = Repository::new("/tmp/repo", "default");

        let err = hg.query(&repo, ".", "{node}").unwrap_err();
        assert!(matches!(err, HgResourceError::Backend { .. }));
        assert!(err.to_string().contains("failed to run /nonexistent/bin/hg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_captures_output() {
        // `false` ignores its arguments and exits 1
        let hg = HgCommand::new("false");
        let repo = Repository::new("/tmp/repo", "default");

        let err = hg
            .push(&repo, "ssh://hg@example.com/repo", "default")
            .unwrap_err();
        assert!(err.to_string().starts_with("Error pushing to ssh://hg@example.com/repo"));
        assert!(err.to_string().contains("exited with 1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_is_passed_through() {
        let hg = HgCommand::new("sh").with_env(&[("AGENT_MARKER".to_string(), "42".to_string())]);
        let repo = Repository::new("/tmp/repo", "default");

        // sh -c 'echo $AGENT_MARKER $HGPLAIN'
        let output = hg
            .run(&repo, "-c", &["echo $AGENT_MARKER $HGPLAIN"], "echo")
            .unwrap();
        assert_eq!(output.trim(), "42 1");
    }
}
