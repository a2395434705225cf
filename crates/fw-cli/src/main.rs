//! Entry point for the `fw` binary: parses arguments, initializes
//! logging, dispatches to the matching subcommand, and maps any error
//! to the process exit code its category owns — matching
//! `assay-cli::main`'s `eprintln!("fatal: {e:?}")` + exit-code pattern.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command};
use fw_common::exit_codes;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let fallback_code = match &cli.command {
        Command::Translate(_) => exit_codes::CONFIG_ERROR,
        Command::Classify(_) => exit_codes::RUNTIME_ERROR,
        Command::Merge(_) | Command::Reconcile(_) => exit_codes::RECONCILIATION_ERROR,
    };

    let result = match cli.command {
        Command::Translate(args) => commands::translate(args),
        Command::Classify(args) => commands::classify(args),
        Command::Merge(args) => commands::merge(args),
        Command::Reconcile(args) => commands::reconcile(args),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            fallback_code
        }
    };
    std::process::exit(code);
}
