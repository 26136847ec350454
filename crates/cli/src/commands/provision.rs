// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rigup provision` - Full provisioning run
//!
//! Orders the stages so the long poles overlap: the native extension
//! build starts right after the app sync and is only joined once the
//! downloads have drained. A run lock keeps concurrent invocations from
//! interleaving git and filesystem state.

use anyhow::{bail, Context, Result};
use clap::Args;
use fs2::FileExt;
use rigup_core::{BundleKey, Clock, ProvisionConfig, SystemClock};
use rigup_supervise::NotifyAdapter;
use rigup_sync::{
    arch_flags, collect_manifest, detect_compute_capability, detect_runtime_versions, join_build,
    signature_from_versions, spawn_build, BuildReport, BuildSpec, BundleCache, GitBuildRunner,
    GitCli, HttpBlobStore,
};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{fetch, launch, sync, Notifier};

const BUILD_JOIN_DEADLINE: Duration = Duration::from_secs(3600);
const BUILD_JOIN_POLL: Duration = Duration::from_secs(10);

#[derive(Args)]
pub struct ProvisionArgs {
    /// Model manifest (TOML); downloads are skipped when omitted
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Enable a download section regardless of the environment flags
    #[arg(short, long)]
    pub section: Vec<String>,

    /// Parallel plugin sync jobs
    #[arg(short = 'j', long, default_value_t = 4)]
    pub jobs: usize,

    /// Publish the plugin tree as a bundle after a from-source sync
    #[arg(long)]
    pub publish: bool,

    /// Stop after provisioning; do not launch workers
    #[arg(long)]
    pub no_launch: bool,
}

pub async fn provision(args: ProvisionArgs) -> Result<()> {
    let config = ProvisionConfig::from_env()?;
    config.validate_runtime()?;
    let _lock = acquire_run_lock(&config)?;
    let notifier = Notifier::from_config(&config);

    sync::sync_app(&config).await?;

    // The extension compiles for up to an hour; everything else proceeds
    // while it runs.
    let build = start_extension_build(&config).await;

    plugins_stage(&config, args.jobs, args.publish).await?;

    if let Some(manifest) = &args.manifest {
        let report = fetch::run_manifest(&config, manifest, &args.section).await?;
        if !report.all_succeeded() {
            let _ = notifier
                .notify(
                    "rig up: downloads incomplete",
                    &format!("{} transfer(s) failed", report.failed.len()),
                )
                .await;
            bail!("{} transfer(s) failed", report.failed.len());
        }
    } else {
        tracing::info!("no manifest given, skipping model downloads");
    }

    join_build_stage(build).await;

    if args.no_launch {
        tracing::info!("provisioning complete, launch skipped");
        return Ok(());
    }
    launch::launch_all(&config, notifier, true).await
}

/// Exclusive advisory lock for the run, held until the handle drops at
/// process exit.
fn acquire_run_lock(config: &ProvisionConfig) -> Result<File> {
    std::fs::create_dir_all(&config.state_dir)?;
    let path = config.state_dir.join("provision.lock");
    let lock = File::create(&path).with_context(|| format!("opening {}", path.display()))?;
    if lock.try_lock_exclusive().is_err() {
        bail!("another provisioning run holds {}", path.display());
    }
    Ok(lock)
}

/// Kick off the native attention extension build in the background.
/// Returns `None` when no GPU is visible; the workers then run on the
/// app's fallback kernels.
async fn start_extension_build(config: &ProvisionConfig) -> Option<JoinHandle<BuildReport>> {
    let Some((major, minor)) = detect_compute_capability().await else {
        tracing::warn!("no GPU detected, skipping extension build");
        return None;
    };
    let spec = BuildSpec {
        repo_url: config.extension.repo_url.clone(),
        revisions: config.extension.revisions.clone(),
        arch_flags: arch_flags(major, minor),
        workdir: config.state_dir.join("build/extension"),
        log_dir: config.state_dir.join("logs"),
    };
    tracing::info!(
        repo = %spec.repo_url,
        compute = format!("{major}.{minor}"),
        "extension build started"
    );
    Some(spawn_build(GitBuildRunner::new(&config.python), spec))
}

async fn join_build_stage(build: Option<JoinHandle<BuildReport>>) {
    let Some(handle) = build else { return };
    match join_build(handle, BUILD_JOIN_DEADLINE, BUILD_JOIN_POLL).await {
        Some(report) if report.succeeded() => {
            tracing::info!(attempts = report.attempts.len(), "extension build succeeded");
        }
        Some(report) => {
            // Non-fatal: the app falls back to its built-in kernels.
            for attempt in &report.attempts {
                tracing::warn!(
                    revision = %attempt.revision,
                    log = %attempt.log_path.display(),
                    "extension build attempt failed"
                );
            }
        }
        None => {
            tracing::warn!("extension build abandoned at deadline");
        }
    }
}

/// Converge the plugin tree, preferring a prebuilt bundle keyed on the
/// installed runtime versions over a from-source sync.
async fn plugins_stage(config: &ProvisionConfig, jobs: usize, publish: bool) -> Result<()> {
    let Some(store_url) = &config.bundle_store else {
        let report = sync::sync_plugins(config, jobs).await?;
        if !report.all_ok() {
            bail!("{} plugin repo(s) failed to sync", report.hard_failures());
        }
        return Ok(());
    };

    let versions = detect_runtime_versions(&config.python).await?;
    let key = BundleKey::new(&config.bundle_tag, signature_from_versions(&versions));
    let cache = BundleCache::new(HttpBlobStore::new(store_url));

    match cache.resolve(&key, &config.plugins_dir).await {
        Ok(true) => {
            tracing::info!(tag = %key.tag, signature = %key.signature, "bundle installed");
            return Ok(());
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(error = %e, "bundle store unreachable, syncing from source");
        }
    }

    let report = sync::sync_plugins(config, jobs).await?;
    if !report.all_ok() {
        bail!("{} plugin repo(s) failed to sync", report.hard_failures());
    }

    if publish {
        let targets = sync::plugin_targets(config)?;
        let manifest =
            collect_manifest(&GitCli, &config.bundle_tag, &config.plugins_dir, &targets).await;
        cache.publish(&key, &config.plugins_dir, &manifest, SystemClock.epoch_secs()).await?;
        tracing::info!(tag = %key.tag, signature = %key.signature, "bundle published");
    }
    Ok(())
}
