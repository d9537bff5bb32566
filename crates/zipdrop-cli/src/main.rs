//! Zipdrop CLI - zip files and folders, then drop copies into any number of
//! destinations such as synced cloud folders.

mod cli;
mod commands;
mod error;
mod output;
mod paths;
mod progress;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    let outcome = match &cli.command {
        Some(cli::Commands::Completion { shell }) => {
            commands::completion::execute(*shell);
            Ok(commands::Outcome::Complete)
        }
        None => commands::bundle::execute(&cli.bundle, &*formatter, cli.quiet || cli.json),
    };

    match outcome {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over the flag-derived level.
fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
