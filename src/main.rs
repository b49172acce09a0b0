use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use hg_resource::cli::{self, Cli};
use hg_resource::{ui, HgResourceError};

fn main() -> ExitCode {
    let cli = Cli::parse_from(cli::invocation_args(std::env::args_os()));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(output) = err
                .downcast_ref::<HgResourceError>()
                .and_then(HgResourceError::output)
            {
                ui::display_backend_output(output);
            }
            ui::display_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    cli::execute(cli, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
