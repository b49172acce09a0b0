//! `out`: publish a working copy from the sources directory.

use super::envelope::{ResourceInput, ResourceOutput};
use crate::domain::PublishRequest;
use crate::error::{HgResourceError, Result};
use crate::hg::VersionControlBackend;
use crate::publish::PublishOrchestrator;
use std::fs;
use std::path::{Path, PathBuf};

/// Knobs the operator controls for `out`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub workspace_root: PathBuf,
    pub max_attempts: u32,
    pub keep_workspace: bool,
}

/// Build the request from the input document, resolving paths against `sources`
pub fn build_request(input: &ResourceInput, sources: &Path) -> Result<PublishRequest> {
    let params = &input.params;

    let repository = params.repository.trim();
    if repository.is_empty() {
        return Err(HgResourceError::config("Parameter 'repository' is required"));
    }

    let destination = if params.destination.trim().is_empty() {
        input.source.uri.trim()
    } else {
        params.destination.trim()
    };
    if destination.is_empty() {
        return Err(HgResourceError::config(
            "Either source.uri or params.destination must be provided",
        ));
    }

    let tag = if params.tag.trim().is_empty() {
        None
    } else {
        let tag_file = sources.join(params.tag.trim());
        let contents = fs::read_to_string(&tag_file).map_err(|e| {
            HgResourceError::resource(format!(
                "Error reading tag file {}: {}",
                tag_file.display(),
                e
            ))
        })?;
        Some(format!("{}{}", params.tag_prefix, contents.trim()))
    };

    PublishRequest::new(
        input.source.repository(sources.join(repository)),
        destination,
        tag,
        params.rebase,
    )
}

pub fn run_out<B: VersionControlBackend + ?Sized>(
    input: &ResourceInput,
    backend: &B,
    sources: &Path,
    options: &PublishOptions,
) -> Result<ResourceOutput> {
    let request = build_request(input, sources)?;

    let outcome = PublishOrchestrator::new(backend, &options.workspace_root)
        .with_max_attempts(options.max_attempts)
        .keep_workspace(options.keep_workspace)
        .publish(&request)?;

    Ok(ResourceOutput {
        metadata: outcome.commit.properties(),
        version: outcome.version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::envelope::{Params, Source};

    fn input(params: Params) -> ResourceInput {
        ResourceInput {
            source: Source {
                uri: "ssh://hg@example.com/repo".to_string(),
                branch: "stable".to_string(),
                ..Source::default()
            },
            version: None,
            params,
        }
    }

    #[test]
    fn test_repository_is_required() {
        let err = build_request(&input(Params::default()), Path::new("/sources")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Parameter 'repository' is required"
        );
    }

    #[test]
    fn test_destination_falls_back_to_source_uri() {
        let request = build_request(
            &input(Params {
                repository: "repo".to_string(),
                ..Params::default()
            }),
            Path::new("/sources"),
        )
        .unwrap();

        assert_eq!(request.destination_uri(), "ssh://hg@example.com/repo");
        assert_eq!(request.source().path, PathBuf::from("/sources/repo"));
        assert_eq!(request.branch(), "stable");
        assert_eq!(request.tag(), None);
    }

    #[test]
    fn test_destination_override() {
        let request = build_request(
            &input(Params {
                repository: "repo".to_string(),
                destination: "ssh://hg@example.com/fork".to_string(),
                ..Params::default()
            }),
            Path::new("/sources"),
        )
        .unwrap();
        assert_eq!(request.destination_uri(), "ssh://hg@example.com/fork");
    }

    #[test]
    fn test_no_destination_at_all() {
        let mut input = input(Params {
            repository: "repo".to_string(),
            ..Params::default()
        });
        input.source.uri.clear();

        let result = build_request(&input, Path::new("/sources"));
        assert!(matches!(result, Err(HgResourceError::Config(_))));
    }

    #[test]
    fn test_tag_read_from_file_with_prefix() {
        let sources = tempfile::tempdir().unwrap();
        fs::create_dir(sources.path().join("version")).unwrap();
        fs::write(sources.path().join("version/number"), "1.4.0\n").unwrap();

        let request = build_request(
            &input(Params {
                repository: "repo".to_string(),
                tag: "version/number".to_string(),
                tag_prefix: "v".to_string(),
                rebase: true,
                ..Params::default()
            }),
            sources.path(),
        )
        .unwrap();

        assert_eq!(request.tag(), Some("v1.4.0"));
        assert!(request.rebase());
    }

    #[test]
    fn test_missing_tag_file() {
        let sources = tempfile::tempdir().unwrap();
        let result = build_request(
            &input(Params {
                repository: "repo".to_string(),
                tag: "missing".to_string(),
                ..Params::default()
            }),
            sources.path(),
        );
        assert!(matches!(result, Err(HgResourceError::Resource(_))));
    }
}
