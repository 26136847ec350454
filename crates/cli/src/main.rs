// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rigup` - GPU rig provisioning for the served generative-media app.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rigup", version, about = "Provision and supervise a GPU worker rig")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full provisioning run: app sync, plugins, models, build, launch
    Provision(commands::provision::ProvisionArgs),
    /// Download model weights from a manifest
    Fetch(commands::fetch::FetchArgs),
    /// Clone or update the app and plugin repositories
    Sync(commands::sync::SyncArgs),
    /// Launch and supervise worker instances
    Launch(commands::launch::LaunchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Provision(args) => commands::provision::provision(args).await,
        Command::Fetch(args) => commands::fetch::fetch(args).await,
        Command::Sync(args) => commands::sync::sync(args).await,
        Command::Launch(args) => commands::launch::launch(args).await,
    }
}
