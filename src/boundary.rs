use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions reported to the operator while the operation carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryWarning {
    /// The pipeline's last version is unknown to the backend; only the latest commit is reported
    UnknownVersion { reference: String },
    /// No commit on the branch passes the path, tag and skip-marker filters
    NoQualifyingCommits { branch: String },
    /// The destination moved while publishing; rebasing again
    PublishConflict { attempt: u32, max_attempts: u32 },
    /// The temporary publish workspace was left on disk on request
    WorkspaceKept { path: PathBuf },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::UnknownVersion { reference } => {
                let short = reference.get(..12).unwrap_or(reference.as_str());
                write!(
                    f,
                    "Version '{}' is unknown to the repository, reporting the latest commit instead",
                    short
                )
            }
            BoundaryWarning::NoQualifyingCommits { branch } => {
                write!(f, "No qualifying commits on branch '{}'", branch)
            }
            BoundaryWarning::PublishConflict {
                attempt,
                max_attempts,
            } => write!(
                f,
                "Destination moved during push (attempt {}/{}), rebasing again",
                attempt, max_attempts
            ),
            BoundaryWarning::WorkspaceKept { path } => {
                write!(f, "Keeping publish workspace at {}", path.display())
            }
        }
    }
}
