// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tiered file store daemon
//!
//! Runs the Router or one of the storage tiers.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tfs_core::{Config, TierId};
use tfs_server::Role;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tfsd")]
#[command(author, version, about = "Tiered file store daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    role: RoleCommand,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "tfs.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum RoleCommand {
    /// Client-facing router; stores .c files and proxies the rest
    Router,

    /// Storage tier for one extension
    Tier {
        #[arg(value_enum)]
        kind: TierKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TierKind {
    Pdf,
    Text,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let role = match cli.role {
        RoleCommand::Router => Role::Router,
        RoleCommand::Tier { kind: TierKind::Pdf } => Role::Tier(TierId::Pdf),
        RoleCommand::Tier { kind: TierKind::Text } => Role::Tier(TierId::Text),
    };

    let config = match Config::load(Some(&cli.config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Starting {}", role.id());
    match tfs_server::run(config, role).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} stopped: {}", role.id(), e);
            ExitCode::FAILURE
        }
    }
}
