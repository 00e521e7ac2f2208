//! Binary entry point for conduit.
//!
//! This binary exposes the document, vector and LLM adapters as subcommands.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use conduit::cli::{ConfigCommand, DocArgs, LlmArgs, VectorArgs};
use conduit::config::ConduitConfig;
use conduit::observability;
use std::path::PathBuf;
use std::process::ExitCode;

/// Conduit - thin clients for a document store, a vector store and chat LLMs.
#[derive(Parser)]
#[command(name = "conduit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(long, global = true, env = "CONDUIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Document store (ArangoDB) operations.
    Doc(DocArgs),

    /// Vector store (Qdrant) operations.
    Vector(VectorArgs),

    /// Chat completion operations.
    Llm(LlmArgs),

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match ConduitConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &ConduitConfig) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match command {
        Commands::Doc(args) => args.run(config, &mut out),
        Commands::Vector(args) => args.run(config, &mut out),
        Commands::Llm(args) => args.run(config, &mut out),
        Commands::Config(command) => command.run(config, &mut out),
    }
}
