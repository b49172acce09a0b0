//! Answers "which commits are pipeline versions" for one working copy.

use crate::boundary::BoundaryWarning;
use crate::domain::{Repository, Version};
use crate::error::{HgResourceError, Result};
use crate::hg::diagnostics::is_unknown_revision;
use crate::hg::{VersionControlBackend, NODE_LINES_TEMPLATE, NODE_TEMPLATE};
use crate::query::QueryBuilder;

/// Result of a detect run: the versions to report plus any non-fatal warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub versions: Vec<Version>,
    pub warning: Option<BoundaryWarning>,
}

/// Read-only version queries against a [VersionControlBackend]
pub struct VersionResolver<'a, B: VersionControlBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: VersionControlBackend + ?Sized> VersionResolver<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        VersionResolver { backend }
    }

    /// The newest qualifying commit, or `None` when nothing qualifies
    pub fn latest(&self, repo: &Repository) -> Result<Option<Version>> {
        let revset = QueryBuilder::new(repo).latest();
        let output = self
            .backend
            .query(repo, &revset, NODE_TEMPLATE)
            .map_err(|e| resolution_error("Error getting latest commit id", e))?;

        let id = output.trim();
        Ok((!id.is_empty()).then(|| Version::new(id)))
    }

    /// Qualifying commits strictly newer than `commit_id`, oldest first.
    ///
    /// Fails with [HgResourceError::UnknownReference] when the backend does
    /// not know `commit_id`.
    pub fn descendants_of(&self, repo: &Repository, commit_id: &str) -> Result<Vec<Version>> {
        let revset = QueryBuilder::new(repo).descendants_of(commit_id);
        let output = self
            .backend
            .query(repo, &revset, NODE_LINES_TEMPLATE)
            .map_err(|e| match e {
                HgResourceError::Backend { output, .. } if is_unknown_revision(&output) => {
                    HgResourceError::UnknownReference {
                        reference: commit_id.to_string(),
                        output,
                    }
                }
                other => resolution_error(
                    &format!("Error getting descendant commits of {}", commit_id),
                    other,
                ),
            })?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && *line != commit_id)
            .map(Version::new)
            .collect())
    }

    /// Versions to report for a check, given the pipeline's last known version.
    ///
    /// Without a prior version, or when the prior version is unknown to the
    /// backend, only the latest commit is reported.
    pub fn detect(&self, repo: &Repository, prior: Option<&Version>) -> Result<Detection> {
        let prior = prior.filter(|v| !v.is_empty());

        let warning = match prior {
            None => None,
            Some(prior) => match self.descendants_of(repo, prior.as_str()) {
                Ok(versions) => {
                    return Ok(Detection {
                        versions,
                        warning: None,
                    })
                }
                Err(HgResourceError::UnknownReference { reference, .. }) => {
                    Some(BoundaryWarning::UnknownVersion { reference })
                }
                Err(e) => return Err(e),
            },
        };

        match self.latest(repo)? {
            Some(latest) => Ok(Detection {
                versions: vec![latest],
                warning,
            }),
            None => Ok(Detection {
                versions: Vec::new(),
                warning: warning.or_else(|| {
                    Some(BoundaryWarning::NoQualifyingCommits {
                        branch: repo.branch.clone(),
                    })
                }),
            }),
        }
    }
}

fn resolution_error(context: &str, err: HgResourceError) -> HgResourceError {
    match err {
        HgResourceError::Backend { output, .. } => HgResourceError::Resolution {
            context: context.to_string(),
            output,
        },
        other => other,
    }
}
