// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rigup sync` - Clone or update the app and plugin repositories

use anyhow::{bail, Result};
use clap::Args;
use rigup_core::{ProvisionConfig, RepoTarget};
use rigup_manifest::resolve_repo_list;
use rigup_sync::{GitCli, PipInstaller, RepoSyncManager, SyncReport};
use std::path::PathBuf;

const DEFAULT_POOL: usize = 4;

#[derive(Args)]
pub struct SyncArgs {
    /// Plugin list file, one clone URL per line
    #[arg(long)]
    pub plugin_file: Option<PathBuf>,

    /// Parallel sync jobs
    #[arg(short = 'j', long, default_value_t = DEFAULT_POOL)]
    pub jobs: usize,

    /// Sync only the served application, skip plugins
    #[arg(long)]
    pub app_only: bool,
}

pub async fn sync(args: SyncArgs) -> Result<()> {
    let mut config = ProvisionConfig::from_env()?;
    config.validate_runtime()?;
    if let Some(file) = args.plugin_file {
        config.plugin_list_file = Some(file);
    }

    sync_app(&config).await?;
    if args.app_only {
        return Ok(());
    }

    let report = sync_plugins(&config, args.jobs).await?;
    if !report.all_ok() {
        bail!("{} plugin repo(s) failed to sync", report.hard_failures());
    }
    Ok(())
}

/// The served application is one more managed repo, rooted at the
/// workspace root instead of the plugins directory. Its sync must succeed
/// before anything downstream runs.
pub async fn sync_app(config: &ProvisionConfig) -> Result<()> {
    let target = app_target(config);
    let manager = RepoSyncManager::new(
        GitCli,
        PipInstaller::new(&config.python),
        config.root.clone(),
    );
    let report = manager.sync_all(std::slice::from_ref(&target), 1).await;
    if !report.all_ok() {
        bail!("application sync failed: {}", config.app_repo_url);
    }
    config.validate_app()?;
    Ok(())
}

/// Converge every plugin repository under the plugins directory.
pub async fn sync_plugins(config: &ProvisionConfig, jobs: usize) -> Result<SyncReport> {
    let targets = plugin_targets(config)?;
    let manager = RepoSyncManager::new(
        GitCli,
        PipInstaller::new(&config.python),
        config.plugins_dir.clone(),
    );
    let report = manager.sync_all(&targets, jobs).await;
    tracing::info!(
        repos = report.results.len(),
        failed = report.hard_failures(),
        "plugin sync finished"
    );
    Ok(report)
}

pub fn plugin_targets(config: &ProvisionConfig) -> Result<Vec<RepoTarget>> {
    let inline = (!config.plugin_urls.is_empty()).then_some(config.plugin_urls.as_slice());
    Ok(resolve_repo_list(config.plugin_list_file.as_deref(), inline)?)
}

fn app_target(config: &ProvisionConfig) -> RepoTarget {
    let mut target = RepoTarget::from_url(&config.app_repo_url);
    // The app manages its own setup; only its dependency manifest applies.
    target.setup_script = None;
    target
}
