//! Ground Truth CLI
//!
//! Keeps a GROUND_TRUTH.md in every folder of a project, either in one
//! pass or continuously while files change.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "groundtruth")]
#[command(author = "Ground Truth Contributors")]
#[command(version)]
#[command(about = "Per-folder GROUND_TRUTH.md documentation, kept up to date", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and generate every GROUND_TRUTH.md
    Init {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Regenerate every GROUND_TRUTH.md under the root
    Update {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Watch for changes and keep GROUND_TRUTH.md files current
    Watch {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Generate every GROUND_TRUTH.md before watching
        #[arg(long)]
        init: bool,

        /// Debounce window per folder, in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Interval between sweeps of deferred folders, in milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        sweep_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Update { path } => commands::update(&path),
        Commands::Watch {
            path,
            init,
            debounce_ms,
            sweep_ms,
        } => commands::watch(&path, init, debounce_ms, sweep_ms).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
