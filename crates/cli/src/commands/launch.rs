// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rigup launch` - Launch and supervise worker instances

use anyhow::Result;
use clap::Args;
use rigup_core::ProvisionConfig;
use rigup_supervise::{
    spawn_monitor, HttpHealthProbe, Launcher, MonitorConfig, NixProcessWatch, NotifyAdapter,
    ReadyOutcome,
};

use super::Notifier;

#[derive(Args)]
pub struct LaunchArgs {
    /// Launch without blocking on the monitor loops
    #[arg(long)]
    pub no_wait: bool,
}

pub async fn launch(args: LaunchArgs) -> Result<()> {
    let config = ProvisionConfig::from_env()?;
    config.validate_runtime()?;
    config.validate_app()?;
    let notifier = Notifier::from_config(&config);
    launch_all(&config, notifier, !args.no_wait).await
}

/// Launch every configured instance, probe each to readiness, send the
/// aggregate summary, then hand each instance to its monitor loop.
///
/// Readiness is non-gating: a worker that missed its window is still
/// monitored, it just starts in the not-ready column of the summary.
pub async fn launch_all(
    config: &ProvisionConfig,
    notifier: Notifier,
    wait: bool,
) -> Result<()> {
    let specs = config.instance_specs();
    let launcher = Launcher::new(config.worker_command(), notifier.clone(), HttpHealthProbe::new());

    let mut launched = Vec::with_capacity(specs.len());
    let mut summary = String::new();
    for spec in &specs {
        let handle = launcher.launch(spec)?;
        let outcome = launcher.await_ready(spec).await;
        let status = match outcome {
            ReadyOutcome::Ready => "ready",
            ReadyOutcome::TimedOut => "not ready",
        };
        summary.push_str(&format!(
            "{}: port {} gpu {} - {}\n",
            spec.name, spec.port, spec.gpu, status
        ));
        launched.push(handle);
    }

    let _ = notifier
        .notify(
            &format!("rig up: {} instance(s) launched", launched.len()),
            summary.trim_end(),
        )
        .await;

    let monitors: Vec<_> = launched
        .iter()
        .map(|handle| {
            spawn_monitor(
                handle.spec.clone(),
                handle.pid,
                HttpHealthProbe::new(),
                NixProcessWatch,
                notifier.clone(),
                MonitorConfig::default(),
            )
        })
        .collect();

    if wait {
        // Steady state: remain alive while instances run. Each monitor
        // returns only when its worker dies.
        for monitor in monitors {
            match monitor.await {
                Ok(state) => tracing::warn!(?state, "worker reached terminal state"),
                Err(e) => tracing::error!(error = %e, "monitor task failed"),
            }
        }
        tracing::warn!("all workers dead, exiting");
    }
    Ok(())
}
