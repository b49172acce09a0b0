use crate::domain::{Changeset, Commit, Phase, Repository};
use crate::error::{HgResourceError, Result};
use crate::hg::{VersionControlBackend, JSON_TEMPLATE, NODE_TEMPLATE};
use chrono::{DateTime, FixedOffset};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// One recorded backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CloneOrUpdate {
        path: PathBuf,
        source_uri: String,
    },
    CloneAtRevision {
        path: PathBuf,
        source_uri: String,
        commit_id: String,
    },
    Checkout {
        path: PathBuf,
        commit_id: String,
    },
    PurgeUntracked {
        path: PathBuf,
    },
    SetMutablePhase {
        path: PathBuf,
    },
    /// `tip` is the commit the tag landed on
    Tag {
        path: PathBuf,
        name: String,
        tip: String,
    },
    PullWithRebase {
        path: PathBuf,
        dest_uri: String,
        branch: String,
    },
    Push {
        path: PathBuf,
        dest_uri: String,
        branch: String,
    },
    Query {
        path: PathBuf,
        revset: String,
        template: String,
    },
}

/// Operations whose failure can be scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CloneOrUpdate,
    CloneAtRevision,
    Checkout,
    PurgeUntracked,
    SetMutablePhase,
    Tag,
    PullWithRebase,
}

#[derive(Default)]
struct MockState {
    calls: Vec<BackendCall>,
    commits: HashMap<String, Commit>,
    tip: Option<String>,
    current: HashMap<PathBuf, String>,
    queries: HashMap<String, std::result::Result<String, String>>,
    push_results: VecDeque<std::result::Result<String, String>>,
    rebase_tips: VecDeque<String>,
    failures: HashMap<Operation, String>,
    generated: u32,
}

/// In-memory backend for testing without an `hg` executable.
///
/// Keeps a flat commit store, the current commit of every working copy it
/// has touched, scripted answers for revision queries, and a queue of push
/// outcomes. Every invocation is recorded for later inspection.
///
/// Tagging records the tag on the current commit instead of creating a
/// separate tag commit.
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    /// Create a new empty mock backend
    pub fn new() -> Self {
        MockBackend {
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // a panicking test must not hide the state from the next assertion
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a commit; the most recently added one is `tip`
    pub fn add_commit(&self, commit: Commit) {
        let mut state = self.state();
        state.tip = Some(commit.id.clone());
        state.commits.insert(commit.id.clone(), commit);
    }

    /// Make `commit_id` the current commit of the working copy at `path`
    pub fn set_current(&self, path: impl Into<PathBuf>, commit_id: impl Into<String>) {
        self.state().current.insert(path.into(), commit_id.into());
    }

    /// Answer `revset` with `output`
    pub fn on_query(&self, revset: impl Into<String>, output: impl Into<String>) {
        self.state()
            .queries
            .insert(revset.into(), Ok(output.into()));
    }

    /// Fail `revset` with the given diagnostic text
    pub fn fail_query(&self, revset: impl Into<String>, diagnostic: impl Into<String>) {
        self.state()
            .queries
            .insert(revset.into(), Err(diagnostic.into()));
    }

    /// Queue the outcome of the next push; pushes succeed once the queue is empty
    pub fn queue_push_result(&self, result: std::result::Result<&str, &str>) {
        self.state()
            .push_results
            .push_back(result.map(str::to_string).map_err(str::to_string));
    }

    /// Queue the id the next rebase produces
    pub fn queue_rebase_tip(&self, commit_id: impl Into<String>) {
        self.state().rebase_tips.push_back(commit_id.into());
    }

    /// Make every invocation of `operation` fail with `diagnostic`
    pub fn fail(&self, operation: Operation, diagnostic: impl Into<String>) {
        self.state().failures.insert(operation, diagnostic.into());
    }

    /// All invocations so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Number of recorded invocations matching `predicate`
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn commit(&self, commit_id: &str) -> Option<Commit> {
        self.state().commits.get(commit_id).cloned()
    }

    fn check_failure(state: &MockState, operation: Operation) -> Result<()> {
        match state.failures.get(&operation) {
            Some(diagnostic) => Err(HgResourceError::backend(
                format!("mock {:?} failed", operation),
                diagnostic.as_str(),
            )),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a commit with sensible defaults for tests
pub fn commit(id: &str, message: &str) -> Commit {
    let timestamp: DateTime<FixedOffset> = DateTime::from_timestamp(1_457_968_493, 0)
        .unwrap_or_default()
        .fixed_offset();

    Commit {
        id: id.to_string(),
        branch: "default".to_string(),
        phase: Phase::Public,
        author: "Jane Doe <jdoe@example.com>".to_string(),
        timestamp,
        message: message.to_string(),
        bookmarks: Vec::new(),
        tags: Vec::new(),
        parents: Vec::new(),
    }
}

impl VersionControlBackend for MockBackend {
    fn clone_or_update(&self, repo: &Repository, source_uri: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::CloneOrUpdate {
            path: repo.path.clone(),
            source_uri: source_uri.to_string(),
        });
        Self::check_failure(&state, Operation::CloneOrUpdate)?;

        if let Some(tip) = state.tip.clone() {
            state.current.entry(repo.path.clone()).or_insert(tip);
        }
        Ok(String::new())
    }

    fn clone_at_revision(
        &self,
        repo: &Repository,
        source_uri: &str,
        commit_id: &str,
    ) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::CloneAtRevision {
            path: repo.path.clone(),
            source_uri: source_uri.to_string(),
            commit_id: commit_id.to_string(),
        });
        Self::check_failure(&state, Operation::CloneAtRevision)?;

        state
            .current
            .insert(repo.path.clone(), commit_id.to_string());
        Ok(String::new())
    }

    fn checkout(&self, repo: &Repository, commit_id: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::Checkout {
            path: repo.path.clone(),
            commit_id: commit_id.to_string(),
        });
        Self::check_failure(&state, Operation::Checkout)?;

        let target = if commit_id == "tip" {
            state.tip.clone()
        } else {
            Some(commit_id.to_string())
        };

        match target {
            Some(id) if state.commits.contains_key(&id) => {
                state.current.insert(repo.path.clone(), id);
                Ok(String::new())
            }
            _ => Err(HgResourceError::backend(
                format!("Error checking out {}", commit_id),
                format!("abort: unknown revision '{}'!\n", commit_id),
            )),
        }
    }

    fn purge_untracked(&self, repo: &Repository) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::PurgeUntracked {
            path: repo.path.clone(),
        });
        Self::check_failure(&state, Operation::PurgeUntracked)?;
        Ok(String::new())
    }

    fn set_mutable_phase(&self, repo: &Repository) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::SetMutablePhase {
            path: repo.path.clone(),
        });
        Self::check_failure(&state, Operation::SetMutablePhase)?;

        if let Some(id) = state.current.get(&repo.path).cloned() {
            if let Some(commit) = state.commits.get_mut(&id) {
                commit.phase = Phase::Draft;
            }
        }
        Ok(String::new())
    }

    fn tag(&self, repo: &Repository, name: &str) -> Result<String> {
        let mut state = self.state();
        let tip = state.current.get(&repo.path).cloned().unwrap_or_default();
        state.calls.push(BackendCall::Tag {
            path: repo.path.clone(),
            name: name.to_string(),
            tip: tip.clone(),
        });
        Self::check_failure(&state, Operation::Tag)?;

        if let Some(commit) = state.commits.get_mut(&tip) {
            commit.tags.push(name.to_string());
        }
        Ok(String::new())
    }

    fn pull_with_rebase(&self, repo: &Repository, dest_uri: &str, branch: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::PullWithRebase {
            path: repo.path.clone(),
            dest_uri: dest_uri.to_string(),
            branch: branch.to_string(),
        });
        Self::check_failure(&state, Operation::PullWithRebase)?;

        let new_id = match state.rebase_tips.pop_front() {
            Some(id) => id,
            None => {
                state.generated += 1;
                format!("rebased{:034}", state.generated)
            }
        };

        let previous = state.current.get(&repo.path).cloned().unwrap_or_default();
        let mut rebased = state
            .commits
            .get(&previous)
            .cloned()
            .unwrap_or_else(|| commit(&new_id, "rebased"));
        rebased.id = new_id.clone();
        rebased.branch = branch.to_string();
        rebased.phase = Phase::Draft;
        rebased.tags.clear();

        state.commits.insert(new_id.clone(), rebased);
        state.current.insert(repo.path.clone(), new_id);
        Ok(String::new())
    }

    fn push(&self, repo: &Repository, dest_uri: &str, branch: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::Push {
            path: repo.path.clone(),
            dest_uri: dest_uri.to_string(),
            branch: branch.to_string(),
        });

        match state.push_results.pop_front() {
            None => Ok(String::new()),
            Some(Ok(output)) => Ok(output),
            Some(Err(diagnostic)) => Err(HgResourceError::backend(
                format!("Error pushing to {}", dest_uri),
                diagnostic,
            )),
        }
    }

    fn query(&self, repo: &Repository, revset: &str, template: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BackendCall::Query {
            path: repo.path.clone(),
            revset: revset.to_string(),
            template: template.to_string(),
        });

        if revset == "." && template == NODE_TEMPLATE {
            return Ok(state.current.get(&repo.path).cloned().unwrap_or_default());
        }

        if template == JSON_TEMPLATE {
            return match state.commits.get(revset) {
                Some(commit) => Ok(serde_json::to_string(&[Changeset::from(commit)])?),
                None => Err(HgResourceError::backend(
                    format!("Error querying revisions {}", revset),
                    format!("abort: unknown revision '{}'!\n", revset),
                )),
            };
        }

        match state.queries.get(revset) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(diagnostic)) => Err(HgResourceError::backend(
                format!("Error querying revisions {}", revset),
                diagnostic.as_str(),
            )),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_current_commit_and_metadata() {
        let backend = MockBackend::new();
        backend.add_commit(commit("aaa", "first"));
        let repo = Repository::new("/tmp/work", "default");
        backend.set_current("/tmp/work", "aaa");

        let current = backend.current_commit_id(&repo).unwrap();
        assert_eq!(current.as_str(), "aaa");

        let metadata = backend.metadata(&repo, "aaa").unwrap();
        assert_eq!(metadata.message, "first");
        assert_eq!(metadata.timestamp, commit("aaa", "first").timestamp);
    }

    #[test]
    fn test_mock_push_queue() {
        let backend = MockBackend::new();
        let repo = Repository::new("/tmp/work", "default");
        backend.queue_push_result(Err("abort: push creates new remote head abc!"));

        assert!(backend.push(&repo, "/srv/hg", "default").is_err());
        assert!(backend.push(&repo, "/srv/hg", "default").is_ok());
        assert_eq!(
            backend.count(|c| matches!(c, BackendCall::Push { .. })),
            2
        );
    }

    #[test]
    fn test_mock_rebase_moves_current() {
        let backend = MockBackend::new();
        backend.add_commit(commit("aaa", "work"));
        backend.set_current("/tmp/work", "aaa");
        backend.queue_rebase_tip("bbb");
        let repo = Repository::new("/tmp/work", "default");

        backend.pull_with_rebase(&repo, "/srv/hg", "default").unwrap();
        assert_eq!(backend.current_commit_id(&repo).unwrap().as_str(), "bbb");
        assert_eq!(backend.commit("bbb").unwrap().message, "work");
    }

    #[test]
    fn test_mock_scripted_failure() {
        let backend = MockBackend::new();
        backend.fail(Operation::PurgeUntracked, "abort: permission denied");
        let repo = Repository::new("/tmp/work", "default");

        let err = backend.purge_untracked(&repo).unwrap_err();
        assert_eq!(err.output(), Some("abort: permission denied"));
    }

    #[test]
    fn test_mock_unscripted_query_is_empty() {
        let backend = MockBackend::new();
        let repo = Repository::new("/tmp/work", "default");
        assert_eq!(backend.query(&repo, "all()", "{node}\n").unwrap(), "");
    }
}
