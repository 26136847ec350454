// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rigup fetch` - Download model weights from a manifest

use anyhow::{bail, Context, Result};
use clap::Args;
use rigup_core::ProvisionConfig;
use rigup_manifest::Manifest;
use rigup_transfer::{DownloadQueue, Fetcher, QueueReport, ReqwestProbe, RpcTransferClient};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

const WAIT_POLL: Duration = Duration::from_secs(3);

#[derive(Args)]
pub struct FetchArgs {
    /// Manifest file (TOML)
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Enable a section regardless of the environment flags (repeatable)
    #[arg(short, long)]
    pub section: Vec<String>,
}

pub async fn fetch(args: FetchArgs) -> Result<()> {
    let config = ProvisionConfig::from_env()?;
    let report = run_manifest(&config, &args.manifest, &args.section).await?;
    if !report.all_succeeded() {
        bail!("{} transfer(s) failed", report.failed.len());
    }
    Ok(())
}

/// Shared by `fetch` and `provision`: enqueue the manifest's enabled
/// sections against the transfer backend and wait the queue out. An
/// interrupt purges the backend's job table so the next run starts clean.
pub async fn run_manifest(
    config: &ProvisionConfig,
    manifest_path: &PathBuf,
    extra_sections: &[String],
) -> Result<QueueReport> {
    let text = std::fs::read_to_string(manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;
    let manifest = Manifest::parse(&text)?.resolve(std::env::vars())?;

    let mut enabled: BTreeSet<String> = config.enabled_sections.clone();
    enabled.extend(extra_sections.iter().map(|s| s.to_ascii_lowercase()));
    if enabled.is_empty() {
        tracing::info!("no download sections enabled, nothing to fetch");
        return Ok(QueueReport::default());
    }

    let client = RpcTransferClient::new(config.rpc.port, config.rpc.secret.clone());
    let fetcher = Fetcher::new(client.clone(), ReqwestProbe::new(), config);
    let queue = DownloadQueue::new(client, fetcher);

    let handles = queue.enqueue_manifest(&manifest, &enabled).await?;
    tracing::info!(jobs = handles.len(), sections = ?enabled, "downloads enqueued");
    if handles.is_empty() {
        return Ok(QueueReport::default());
    }

    tokio::select! {
        report = queue.wait_all(&handles, WAIT_POLL) => {
            let report = report?;
            queue.purge_all(&handles).await?;
            for (name, reason) in &report.failed {
                tracing::error!(%name, %reason, "download failed");
            }
            Ok(report)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, purging transfer queue");
            queue.purge_all(&handles).await?;
            bail!("interrupted")
        }
    }
}
