use crate::domain::Repository;
use crate::error::{HgResourceError, Result};

/// Everything needed to publish one working copy upstream.
///
/// Built and validated once per `out` invocation, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    source: Repository,
    destination_uri: String,
    branch: String,
    tag: Option<String>,
    rebase: bool,
}

impl PublishRequest {
    /// Validate and build a request.
    ///
    /// The target branch is the source descriptor's branch. Blank tags are
    /// treated as "no tag".
    pub fn new(
        source: Repository,
        destination_uri: impl Into<String>,
        tag: Option<String>,
        rebase: bool,
    ) -> Result<Self> {
        let destination_uri = destination_uri.into();
        if destination_uri.trim().is_empty() {
            return Err(HgResourceError::config(
                "Destination repository URI must be provided",
            ));
        }

        if source.path.as_os_str().is_empty() {
            return Err(HgResourceError::config(
                "Parameter 'repository' is required",
            ));
        }

        let tag = tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if let Some(tag) = &tag {
            if tag.contains('\n') {
                return Err(HgResourceError::config(format!(
                    "Tag value must be a single line, got {:?}",
                    tag
                )));
            }
        }

        let branch = source.branch.clone();

        Ok(PublishRequest {
            source,
            destination_uri,
            branch,
            tag,
            rebase,
        })
    }

    pub fn source(&self) -> &Repository {
        &self.source
    }

    pub fn destination_uri(&self) -> &str {
        &self.destination_uri
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn rebase(&self) -> bool {
        self.rebase
    }
}
