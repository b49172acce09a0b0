//! `check`: report new versions since the pipeline's last one.

use super::envelope::ResourceInput;
use crate::domain::Version;
use crate::error::Result;
use crate::hg::VersionControlBackend;
use crate::resolver::VersionResolver;
use crate::ui;
use std::path::Path;

/// Refresh the cached clone in `cache_dir` and detect versions in it
pub fn run_check<B: VersionControlBackend + ?Sized>(
    input: &ResourceInput,
    backend: &B,
    cache_dir: &Path,
) -> Result<Vec<Version>> {
    let uri = input.source.require_uri()?;
    let repo = input.source.repository(cache_dir);

    ui::display_backend_output(&backend.clone_or_update(&repo, uri)?);

    let detection = VersionResolver::new(backend).detect(&repo, input.version.as_ref())?;
    if let Some(warning) = &detection.warning {
        ui::display_boundary_warning(warning);
    }

    Ok(detection.versions)
}
