//! Publishing a working copy upstream.
//!
//! The commit the source working copy is at gets cloned into a fresh,
//! truncated workspace. That clone is optionally tagged and pushed, either
//! once or through the rebase-retry loop in [state].

pub mod state;

use crate::boundary::BoundaryWarning;
use crate::domain::{Commit, PublishRequest, Repository, Version};
use crate::error::{HgResourceError, Result};
use crate::hg::{classify_push_failure, FailureKind, VersionControlBackend};
use crate::ui;
use state::{PublishState, RetryPlan, StepOutcome, DEFAULT_MAX_ATTEMPTS};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// What a successful publish reports back
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub version: Version,
    pub commit: Commit,
    /// Push attempts made, 1 when rebasing is disabled
    pub attempts: u32,
}

/// Temporary working copy owned by one publish call.
///
/// Deleted on drop unless kept for debugging.
struct Workspace {
    dir: Option<TempDir>,
    keep: bool,
}

impl Workspace {
    fn create(root: &Path, commit_id: &str, keep: bool) -> Result<Self> {
        let short = commit_id.get(..12).unwrap_or(commit_id);
        let dir = tempfile::Builder::new()
            .prefix(&format!("hg-resource-out-{}-", short))
            .tempdir_in(root)
            .map_err(|e| {
                HgResourceError::resource(format!(
                    "Error creating publish workspace in {}: {}",
                    root.display(),
                    e
                ))
            })?;

        Ok(Workspace {
            dir: Some(dir),
            keep,
        })
    }

    /// Where the truncated clone lives; the clone creates this directory itself
    fn clone_path(&self) -> PathBuf {
        self.dir
            .as_ref()
            .map(|d| d.path().join("repo"))
            .unwrap_or_default()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if self.keep {
                let path = dir.keep();
                ui::display_boundary_warning(&BoundaryWarning::WorkspaceKept { path });
            }
        }
    }
}

/// Runs the publish protocol against a [VersionControlBackend]
pub struct PublishOrchestrator<'a, B: VersionControlBackend + ?Sized> {
    backend: &'a B,
    workspace_root: PathBuf,
    max_attempts: u32,
    keep_workspace: bool,
}

impl<'a, B: VersionControlBackend + ?Sized> PublishOrchestrator<'a, B> {
    /// Workspaces are created under `workspace_root`
    pub fn new(backend: &'a B, workspace_root: impl Into<PathBuf>) -> Self {
        PublishOrchestrator {
            backend,
            workspace_root: workspace_root.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            keep_workspace: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Leave the workspace on disk afterwards, for debugging
    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    pub fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let source = request.source();
        let commit_id = self.backend.current_commit_id(source)?;
        ui::display_status(&format!(
            "Publishing {} to {} (branch '{}')",
            commit_id,
            request.destination_uri(),
            request.branch()
        ));

        let workspace = Workspace::create(&self.workspace_root, commit_id.as_str(), self.keep_workspace)?;
        let clone = source.relocated(workspace.clone_path());

        echo(self.backend.clone_at_revision(
            &clone,
            &source.as_source_uri(),
            commit_id.as_str(),
        )?);
        echo(self.backend.set_mutable_phase(&clone)?);

        let attempts = if request.rebase() {
            self.push_with_rebase(&clone, request)?
        } else {
            self.push_once(&clone, request)?
        };

        let version = self.backend.current_commit_id(&clone)?;
        let commit = self.backend.metadata(&clone, version.as_str())?;
        ui::display_success(&format!("Pushed {} to {}", version, request.destination_uri()));

        Ok(PublishOutcome {
            version,
            commit,
            attempts,
        })
    }

    /// Tag if requested and push once; any failure is reported verbatim
    fn push_once(&self, clone: &Repository, request: &PublishRequest) -> Result<u32> {
        if let Some(tag) = request.tag() {
            echo(self.backend.tag(clone, tag)?);
        }
        echo(self
            .backend
            .push(clone, request.destination_uri(), request.branch())?);
        Ok(1)
    }

    /// The rebase-tag-push loop; returns the number of push attempts made
    fn push_with_rebase(&self, clone: &Repository, request: &PublishRequest) -> Result<u32> {
        let plan = RetryPlan {
            max_attempts: self.max_attempts,
            tag: request.tag().is_some(),
        };

        let mut state = PublishState::start();
        let mut last_error: Option<HgResourceError> = None;

        while !state.is_terminal() {
            let outcome = match state {
                PublishState::Rebasing { .. } => self.step(
                    self.backend
                        .pull_with_rebase(clone, request.destination_uri(), request.branch()),
                    &mut last_error,
                    |_| FailureKind::Fatal,
                ),
                PublishState::Tagging { .. } => self.step(
                    self.backend.tag(clone, request.tag().unwrap_or_default()),
                    &mut last_error,
                    |_| FailureKind::Fatal,
                ),
                PublishState::Pushing { .. } => self.step(
                    self.backend
                        .push(clone, request.destination_uri(), request.branch()),
                    &mut last_error,
                    |err| err.output().map(classify_push_failure).unwrap_or(FailureKind::Fatal),
                ),
                _ => break,
            };

            let next = state.next(outcome, &plan);
            if let (PublishState::Pushing { attempt }, PublishState::Rebasing { .. }) = (state, next) {
                ui::display_boundary_warning(&BoundaryWarning::PublishConflict {
                    attempt,
                    max_attempts: plan.max_attempts,
                });
            }
            state = next;
        }

        match state {
            PublishState::Done { attempts } => Ok(attempts),
            PublishState::Exhausted { attempts } => Err(HgResourceError::RetriesExhausted {
                attempts,
                output: last_error
                    .as_ref()
                    .and_then(|e| e.output())
                    .unwrap_or_default()
                    .to_string(),
            }),
            _ => Err(last_error.unwrap_or_else(|| {
                HgResourceError::backend("Publish stopped in an unexpected state", String::new())
            })),
        }
    }

    /// Turn a backend result into a state-machine outcome, keeping the error around
    fn step(
        &self,
        result: Result<String>,
        last_error: &mut Option<HgResourceError>,
        classify: impl Fn(&HgResourceError) -> FailureKind,
    ) -> StepOutcome {
        match result {
            Ok(output) => {
                echo(output);
                StepOutcome::Succeeded
            }
            Err(err) => {
                let kind = classify(&err);
                *last_error = Some(err);
                StepOutcome::Failed(kind)
            }
        }
    }
}

fn echo(output: String) {
    ui::display_backend_output(&output);
}
