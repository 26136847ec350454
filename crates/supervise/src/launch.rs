// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process launch and readiness probing.
//!
//! Each worker runs in its own process group with stdout/stderr tied to
//! its instance log, so it survives the launcher and its output stays
//! attributable. Readiness is probed on a fixed cadence up to a bound;
//! timing out warns but never gates the rest of startup.

use rigup_core::{InstanceSpec, WorkerCommand};
use std::process::Stdio;
use std::time::Duration;

use crate::notify::NotifyAdapter;
use crate::probe::HealthProbe;
use crate::LaunchError;

const READY_POLL: Duration = Duration::from_secs(2);
const READY_TIMEOUT: Duration = Duration::from_secs(60);

/// A launched worker. Holds the child so the process group stays
/// reap-able; dropping the handle does not kill the worker.
#[derive(Debug)]
pub struct InstanceHandle {
    pub spec: InstanceSpec,
    pub pid: i32,
    child: tokio::process::Child,
}

impl InstanceHandle {
    /// True while the child has not been observed to exit.
    pub fn try_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Result of the readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    Ready,
    TimedOut,
}

/// Spawns workers and probes them to readiness.
pub struct Launcher<N: NotifyAdapter, P: HealthProbe> {
    command: WorkerCommand,
    notify: N,
    probe: P,
    ready_poll: Duration,
    ready_timeout: Duration,
}

impl<N: NotifyAdapter, P: HealthProbe> Launcher<N, P> {
    pub fn new(command: WorkerCommand, notify: N, probe: P) -> Self {
        Self { command, notify, probe, ready_poll: READY_POLL, ready_timeout: READY_TIMEOUT }
    }

    /// Override the probe cadence. Tests shrink it to milliseconds.
    pub fn with_timing(mut self, poll: Duration, timeout: Duration) -> Self {
        self.ready_poll = poll;
        self.ready_timeout = timeout;
        self
    }

    /// Spawn one worker per its spec. Output and cache directories are
    /// created here so instance isolation holds from the first write.
    pub fn launch(&self, spec: &InstanceSpec) -> Result<InstanceHandle, LaunchError> {
        std::fs::create_dir_all(&spec.output_dir)?;
        std::fs::create_dir_all(&spec.cache_dir)?;
        if let Some(log_dir) = spec.log_file.parent() {
            std::fs::create_dir_all(log_dir)?;
        }
        let log = std::fs::File::create(&spec.log_file)?;
        let log_err = log.try_clone()?;

        let mut cmd = tokio::process::Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg("--port")
            .arg(spec.port.to_string())
            .arg("--output-directory")
            .arg(&spec.output_dir)
            .arg("--temp-directory")
            .arg(&spec.cache_dir)
            .args(&spec.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .process_group(0);
        if let Some(mask) = spec.gpu.visible_devices() {
            cmd.env("CUDA_VISIBLE_DEVICES", mask);
        }

        let child = cmd.spawn().map_err(|e| LaunchError::Spawn {
            name: spec.name.clone(),
            message: e.to_string(),
        })?;
        let pid = child.id().map(|id| id as i32).ok_or_else(|| LaunchError::NoPid {
            name: spec.name.clone(),
        })?;

        tracing::info!(
            name = %spec.name,
            port = spec.port,
            gpu = %spec.gpu,
            pid,
            log = %spec.log_file.display(),
            "worker launched"
        );
        Ok(InstanceHandle { spec: spec.clone(), pid, child })
    }

    /// Probe until the worker answers or the timeout passes, then send
    /// exactly one ready or not-ready notification. Never an error: a
    /// worker that missed the window may still come up later.
    pub async fn await_ready(&self, spec: &InstanceSpec) -> ReadyOutcome {
        let started = std::time::Instant::now();
        loop {
            if self.probe.is_up(spec.port).await {
                tracing::info!(name = %spec.name, port = spec.port, "worker ready");
                let _ = self
                    .notify
                    .notify(&format!("{} ready", spec.name), &format!("port {} answering", spec.port))
                    .await;
                return ReadyOutcome::Ready;
            }
            if started.elapsed() >= self.ready_timeout {
                tracing::warn!(name = %spec.name, port = spec.port, "worker not ready in time");
                let _ = self
                    .notify
                    .notify(
                        &format!("{} not ready", spec.name),
                        &format!("port {} still silent after {}s", spec.port, self.ready_timeout.as_secs()),
                    )
                    .await;
                return ReadyOutcome::TimedOut;
            }
            tokio::time::sleep(self.ready_poll).await;
        }
    }
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
