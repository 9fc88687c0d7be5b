// src/bin/veris.rs

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use veris::cli::{Cli, Commands};
use veris::commands::check::check_files;
use veris::commands::dump::dump_files;

fn main() -> ExitCode {
    // Initialize tracing if VERIS_LOG is set
    if let Ok(filter) = EnvFilter::try_from_env("VERIS_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Check {
            files,
            tops,
            params,
            lint,
            error_limit,
        } => check_files(&files, &tops, &params, lint, error_limit, cli.color),
        Commands::Dump {
            files,
            tops,
            params,
        } => dump_files(&files, &tops, &params),
    }
}
