//! `in`: put a requested version on disk.

use super::envelope::{ResourceInput, ResourceOutput};
use crate::error::Result;
use crate::hg::VersionControlBackend;
use crate::ui;
use std::path::Path;

/// Revision checked out when the request names none
const TIP: &str = "tip";

/// Clone or update into `destination`, check out the requested version and
/// strip untracked files
pub fn run_in<B: VersionControlBackend + ?Sized>(
    input: &ResourceInput,
    backend: &B,
    destination: &Path,
) -> Result<ResourceOutput> {
    let uri = input.source.require_uri()?;
    let repo = input.source.repository(destination);

    let reference = input
        .version
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| v.as_str())
        .unwrap_or(TIP);

    ui::display_status(&format!("Fetching {} into {}", reference, destination.display()));
    ui::display_backend_output(&backend.clone_or_update(&repo, uri)?);
    ui::display_backend_output(&backend.checkout(&repo, reference)?);
    ui::display_backend_output(&backend.purge_untracked(&repo)?);

    let version = backend.current_commit_id(&repo)?;
    let commit = backend.metadata(&repo, version.as_str())?;

    Ok(ResourceOutput {
        metadata: commit.properties(),
        version,
    })
}
