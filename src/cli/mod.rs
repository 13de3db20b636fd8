//! Command-line interface for stratum
//!
//! Provides the `serve` subcommand; logging is set up by the reporter
//! component once the configuration is resolved.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod serve;

pub use serve::{ServeArgs, ServeConfiguration};

/// Resolve a layered configuration and run service components
#[derive(Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start stratum and run until terminated
    Serve(serve::ServeArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve::run(args, cli.verbose),
    }
}
