use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    compare::{self, CompareArgs},
    revisions::{self, RevisionsArgs},
    run::{self, RunArgs},
};
use scarlet_core::HarnessError;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "scarlet-test",
    about = "Regression runs of the scarlet deblender against a named revision",
    version
)]
struct Cli {
    /// Log at debug level when RUST_LOG is unset.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deblend a dataset under a revision and store its measurements.
    Run(RunArgs),
    /// Summarise one metric across stored revisions of a dataset.
    Compare(CompareArgs),
    /// List the revisions recorded for a dataset.
    Revisions(RevisionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let result = match &cli.command {
        Command::Run(args) => run::run(args),
        Command::Compare(args) => compare::run(args),
        Command::Revisions(args) => revisions::run(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(family = err.family(), code = err.info().code.as_str(), "{err}");
            eprintln!("error: {err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

// Clap reserves 2 for usage errors.
fn exit_code(err: &HarnessError) -> u8 {
    match err {
        HarnessError::Config(_) => 10,
        HarnessError::UnknownDataset(_) => 11,
        HarnessError::InvalidRevision(_) => 12,
        HarnessError::ExistingRevision(_) => 13,
        HarnessError::Scene(_) => 14,
        HarnessError::Deblend(_) => 15,
        HarnessError::Plotting(_) => 16,
        HarnessError::Storage(_) => 17,
        HarnessError::Serde(_) => 18,
    }
}
