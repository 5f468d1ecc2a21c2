//! Wiki CLI - markup compiler.
//!
//! Provides commands for:
//! - `compile`: Compile a page to HTML (or a JSON report)
//! - `check`: Compile a page and fail on any recovered error
//! - `functions`: List the available wiki functions

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, CompileArgs, FunctionsArgs};
use output::Output;

/// Wiki - markup compiler.
#[derive(Parser)]
#[command(name = "wiki", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a page body to HTML.
    Compile(CompileArgs),
    /// Compile a page and report recovered errors.
    Check(CheckArgs),
    /// List the available wiki functions.
    Functions(FunctionsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Compile(args) => args.page.verbose,
        Commands::Check(args) => args.page.verbose,
        Commands::Functions(_) => false,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Compile(args) => args.execute(),
        Commands::Check(args) => args.execute(),
        Commands::Functions(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
