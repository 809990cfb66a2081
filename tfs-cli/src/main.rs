// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tiered file store client
//!
//! Talks to the router only; tiers are never contacted directly.

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tfs_core::Config;
use tfs_providers::RouterSession;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tfs")]
#[command(author, version, about = "Tiered file store client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Router address (defaults to the configured router port on localhost)
    #[arg(short, long, global = true)]
    addr: Option<SocketAddr>,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session over one connection
    Shell,

    /// Upload a local file into a directory on the store
    Ufile {
        /// Local file (.c, .pdf or .txt)
        file: PathBuf,

        /// Destination directory
        #[arg(default_value = "")]
        dest: String,
    },

    /// Download a file into the current directory
    Dfile {
        /// Path on the store
        path: String,
    },

    /// Delete a file from the store
    Rmfile {
        /// Path on the store
        path: String,
    },

    /// Download every file of one extension as a tar archive
    Dtar {
        /// Extension, e.g. `.pdf`
        extension: String,
    },

    /// List file names in a directory across all tiers
    #[command(alias = "ls")]
    Display {
        /// Directory on the store
        #[arg(default_value = "")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let addr = cli.addr.unwrap_or_else(|| commands::router_addr(&config));
    let mut session = RouterSession::new(addr, config.transfer.clone());

    let result = match cli.command {
        Commands::Shell => commands::shell(&mut session, cli.verbose).await,
        Commands::Ufile { file, dest } => commands::ufile(&mut session, &file, &dest, cli.verbose).await,
        Commands::Dfile { path } => commands::dfile(&mut session, &path, cli.verbose).await,
        Commands::Rmfile { path } => commands::rmfile(&mut session, &path, cli.verbose).await,
        Commands::Dtar { extension } => commands::dtar(&mut session, &extension, cli.verbose).await,
        Commands::Display { path } => commands::display(&mut session, &path, cli.verbose).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
