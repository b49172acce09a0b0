//! Command-line surface: argument parsing, dispatch and the JSON envelopes.
//!
//! Each subcommand reads one request document from stdin and writes one
//! response document to stdout. The binary may also be installed under the
//! names `check`, `in` and `out`, in which case the name selects the
//! subcommand.

pub mod check;
pub mod envelope;
pub mod materialize;
pub mod publish;

use crate::config::{load_settings, Settings};
use crate::credentials::CredentialSession;
use crate::domain::Version;
use crate::error::{HgResourceError, Result};
use crate::hg::{HgCommand, VersionControlBackend};
use crate::ui;
use clap::{Parser, Subcommand};
use envelope::{ResourceInput, ResourceOutput};
use serde::Serialize;
use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub use check::run_check;
pub use materialize::run_in;
pub use publish::{run_out, PublishOptions};

#[derive(Debug, Parser)]
#[command(
    name = "hgresource",
    version,
    about = "Detect, fetch and publish versions of a Mercurial repository"
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Custom settings file path")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "HG_RESOURCE_KEEP_WORKSPACE",
        help = "Leave the temporary publish workspace on disk"
    )]
    pub keep_workspace: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List versions newer than the one on stdin
    Check,
    /// Fetch a version into a directory
    #[command(name = "in")]
    In { destination: PathBuf },
    /// Publish a working copy found under the sources directory
    #[command(name = "out")]
    Out { sources: PathBuf },
}

/// What a subcommand writes to stdout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Versions(Vec<Version>),
    Resource(ResourceOutput),
}

/// Map `check`/`in`/`out` invocation names onto the matching subcommand.
///
/// Any other program name leaves the arguments untouched.
pub fn invocation_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();

    let invoked_as = args
        .first()
        .and_then(|argv0| Path::new(argv0).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string);

    if let Some(name) = invoked_as {
        if matches!(name.as_str(), "check" | "in" | "out") {
            args.insert(1, OsString::from(name));
        }
    }

    args
}

/// Run one subcommand against `backend` and return its response
pub fn dispatch<B: VersionControlBackend + ?Sized>(
    command: &Command,
    input: &ResourceInput,
    backend: &B,
    settings: &Settings,
    keep_workspace: bool,
) -> Result<Response> {
    match command {
        Command::Check => Ok(Response::Versions(run_check(
            input,
            backend,
            &settings.check_cache_dir(),
        )?)),
        Command::In { destination } => {
            Ok(Response::Resource(run_in(input, backend, destination)?))
        }
        Command::Out { sources } => {
            let options = PublishOptions {
                workspace_root: settings.workspace_root(),
                max_attempts: settings.publish.max_attempts,
                keep_workspace: keep_workspace || settings.publish.keep_workspace,
            };
            Ok(Response::Resource(run_out(input, backend, sources, &options)?))
        }
    }
}

/// Full invocation: settings, request document, credentials, backend, response.
///
/// Nothing is written to `output` unless the whole operation succeeded.
pub fn execute(cli: &Cli, input: impl Read, output: impl Write) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    let input = envelope::parse_input(input)?;

    let session = if input.source.private_key.trim().is_empty() {
        None
    } else {
        Some(CredentialSession::start(
            &input.source.private_key,
            &settings.key_dir(),
            &settings.credentials,
        )?)
    };

    let env = session
        .as_ref()
        .map(|s| s.env().to_vec())
        .unwrap_or_default();
    let backend = HgCommand::new(settings.backend.binary.as_str()).with_env(&env);

    let response = dispatch(&cli.command, &input, &backend, &settings, cli.keep_workspace);
    let teardown = session.map_or(Ok(()), CredentialSession::close);

    let (response, unreported) = settle(response, teardown);
    if let Some(err) = unreported {
        ui::display_error(&format!("Error in cleanup: {}", err));
    }

    envelope::write_json(output, &response?)
}

/// Merge an operation's result with the credential teardown that followed it.
///
/// The operation's own error takes precedence. A teardown failure it masks
/// comes back separately so it can still be reported.
fn settle<T>(outcome: Result<T>, teardown: Result<()>) -> (Result<T>, Option<HgResourceError>) {
    match (outcome, teardown) {
        (Ok(value), Ok(())) => (Ok(value), None),
        (Ok(_), Err(teardown_err)) => (Err(teardown_err), None),
        (Err(err), Ok(())) => (Err(err), None),
        (Err(err), Err(teardown_err)) => (Err(err), Some(teardown_err)),
    }
}
