//! Version-control backend abstraction layer
//!
//! The backend is an external executable; the rest of the crate composes its
//! primitive operations (clone, pull, checkout, tag, push, query) into the
//! detect, materialize and publish protocols.
//!
//! - [command::HgCommand]: shells out to the `hg` binary
//! - [mock::MockBackend]: in-memory fake for tests
//!
//! Most code should depend on the [VersionControlBackend] trait rather than a
//! concrete implementation.

pub mod command;
pub mod diagnostics;
pub mod mock;

pub use command::HgCommand;
pub use diagnostics::{classify_push_failure, FailureKind};
pub use mock::MockBackend;

use crate::domain::{Commit, Repository, Version};
use crate::error::{HgResourceError, Result};

/// Template printing just the commit id
pub const NODE_TEMPLATE: &str = "{node}";

/// Template printing one commit id per line
pub const NODE_LINES_TEMPLATE: &str = "{node}\n";

/// Template printing one JSON record per commit
pub const JSON_TEMPLATE: &str = "json";

/// Operations the backend exposes against one working copy.
///
/// Every operation returns the backend's captured output on success. On
/// failure the error is [HgResourceError::Backend] carrying the raw
/// diagnostic text, which callers may classify.
///
/// ## Thread Safety
///
/// Implementors must be `Send + Sync`; invocations are nevertheless issued
/// strictly one after another.
pub trait VersionControlBackend: Send + Sync {
    /// Clone `source_uri` into the working copy, or pull and update to the
    /// tracked branch when it already exists
    fn clone_or_update(&self, repo: &Repository, source_uri: &str) -> Result<String>;

    /// Clone `source_uri` truncated at `commit_id`; later history is not carried over
    fn clone_at_revision(&self, repo: &Repository, source_uri: &str, commit_id: &str)
        -> Result<String>;

    /// Update the working directory to `commit_id`, discarding local changes
    fn checkout(&self, repo: &Repository, commit_id: &str) -> Result<String>;

    /// Remove untracked and ignored files
    fn purge_untracked(&self, repo: &Repository) -> Result<String>;

    /// Mark local commits mutable so they can be rebased
    fn set_mutable_phase(&self, repo: &Repository) -> Result<String>;

    /// Tag the current tip
    fn tag(&self, repo: &Repository, name: &str) -> Result<String>;

    /// Pull `branch` from `dest_uri` and replay local commits onto its tip
    fn pull_with_rebase(&self, repo: &Repository, dest_uri: &str, branch: &str) -> Result<String>;

    /// Push `branch` to `dest_uri`
    fn push(&self, repo: &Repository, dest_uri: &str, branch: &str) -> Result<String>;

    /// Evaluate a revision expression and render each match with `template`
    fn query(&self, repo: &Repository, revset: &str, template: &str) -> Result<String>;

    /// Id of the commit the working directory is at
    fn current_commit_id(&self, repo: &Repository) -> Result<Version> {
        let output = self.query(repo, ".", NODE_TEMPLATE).map_err(|e| match e {
            HgResourceError::Backend { output, .. } => {
                HgResourceError::backend("Error getting current commit id", output)
            }
            other => other,
        })?;

        let id = output.trim();
        if id.is_empty() {
            return Err(HgResourceError::backend(
                "Error getting current commit id: working copy has no parent",
                output.as_str(),
            ));
        }

        Ok(Version::new(id))
    }

    /// Full metadata of one commit
    fn metadata(&self, repo: &Repository, commit_id: &str) -> Result<Commit> {
        let output = self
            .query(repo, commit_id, JSON_TEMPLATE)
            .map_err(|e| match e {
                HgResourceError::Backend { output, .. } => HgResourceError::backend(
                    format!("Error getting metadata for commit {}", commit_id),
                    output,
                ),
                other => other,
            })?;

        Commit::parse_log_json(&output)
    }
}
