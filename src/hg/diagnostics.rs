//! Classification of backend diagnostic text.

/// The backend's canonical non-fast-forward rejection
pub const NEW_REMOTE_HEAD_PREFIX: &str = "abort: push creates new remote head";

/// Printed when a revision expression names a commit the clone doesn't have
const UNKNOWN_REVISION_MARKER: &str = "unknown revision";

/// How a failed push should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Someone else pushed first; rebasing and retrying may succeed
    Conflict,
    /// Anything else: authentication, network, malformed branch, ...
    Fatal,
}

/// Classify the diagnostic output of a failed push.
///
/// Only a line starting with [NEW_REMOTE_HEAD_PREFIX] is a conflict.
pub fn classify_push_failure(output: &str) -> FailureKind {
    let conflict = output
        .lines()
        .any(|line| line.trim_start().starts_with(NEW_REMOTE_HEAD_PREFIX));

    if conflict {
        FailureKind::Conflict
    } else {
        FailureKind::Fatal
    }
}

/// Whether a failed query referenced a commit unknown to the working copy
pub fn is_unknown_revision(output: &str) -> bool {
    output.contains(UNKNOWN_REVISION_MARKER)
}
