// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background build of the GPU-accelerated attention extension.
//!
//! Upstream occasionally ships revisions that do not compile against the
//! pinned toolchain, so the builder tries an ordered list of candidate
//! revisions, each from a fresh clone, and stops at the first success.
//! Exhausting the list degrades the rig (slower attention kernels), it
//! never aborts provisioning.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::proc::{run_checked, run_with_timeout, GIT_TIMEOUT};

const BUILD_TIMEOUT: Duration = Duration::from_secs(3600);

/// What to build, from where, and where the attempt logs go.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    pub repo_url: String,
    /// Candidate revisions, tried strictly in order.
    pub revisions: Vec<String>,
    /// Architecture list passed to the compiler, newest first.
    pub arch_flags: Vec<String>,
    /// Checkout directory, recreated per attempt.
    pub workdir: PathBuf,
    pub log_dir: PathBuf,
}

/// Terminal outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAttempt {
    pub revision: String,
    pub log_path: PathBuf,
    pub outcome: BuildOutcome,
}

/// Every attempt made, in order; `succeeded` iff the last one succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub attempts: Vec<BuildAttempt>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        matches!(
            self.attempts.last(),
            Some(BuildAttempt { outcome: BuildOutcome::Succeeded, .. })
        )
    }
}

/// Checkout and compile steps behind the fallback loop.
#[async_trait]
pub trait BuildRunner: Clone + Send + Sync + 'static {
    /// Fresh checkout of `revision` at `dest`. Any previous checkout at
    /// `dest` is gone afterwards, even on failure.
    async fn checkout(&self, url: &str, revision: &str, dest: &Path) -> Result<(), String>;
    /// Compile the checkout, appending compiler output to `log`.
    async fn compile(&self, dir: &Path, arch_flags: &[String], log: &Path) -> Result<(), String>;
}

/// git + pip build of the extension wheel.
#[derive(Clone)]
pub struct GitBuildRunner {
    python: PathBuf,
}

impl GitBuildRunner {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self { python: python.into() }
    }
}

#[async_trait]
impl BuildRunner for GitBuildRunner {
    async fn checkout(&self, url: &str, revision: &str, dest: &Path) -> Result<(), String> {
        let _ = tokio::fs::remove_dir_all(dest).await;
        let dest_str = dest.display().to_string();
        let mut clone = tokio::process::Command::new("git");
        clone.args(["clone", "--recursive", url, &dest_str]);
        run_checked(clone, GIT_TIMEOUT, "git clone").await.map_err(|e| e.to_string())?;

        let mut reset = tokio::process::Command::new("git");
        reset.args(["-C", &dest_str, "reset", "--hard", revision]);
        run_checked(reset, GIT_TIMEOUT, "git reset").await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn compile(&self, dir: &Path, arch_flags: &[String], log: &Path) -> Result<(), String> {
        let log_file = std::fs::File::create(log).map_err(|e| e.to_string())?;
        let log_clone = log_file.try_clone().map_err(|e| e.to_string())?;

        let mut cmd = tokio::process::Command::new(&self.python);
        cmd.args(["-m", "pip", "install", "--no-build-isolation", "."])
            .current_dir(dir)
            .env("TORCH_CUDA_ARCH_LIST", arch_flags.join(";"))
            .stdout(std::process::Stdio::from(log_file))
            .stderr(std::process::Stdio::from(log_clone));
        let output = run_with_timeout(cmd, BUILD_TIMEOUT, "extension build")
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(format!("build exited {}, log at {}", output.status, log.display()));
        }
        Ok(())
    }
}

/// Compute capability reported by the driver, as (major, minor).
pub async fn detect_compute_capability() -> Option<(u32, u32)> {
    let mut cmd = tokio::process::Command::new("nvidia-smi");
    cmd.args(["--query-gpu=compute_cap", "--format=csv,noheader"]);
    let output = run_with_timeout(cmd, Duration::from_secs(30), "nvidia-smi").await.ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?.trim();
    let (major, minor) = first.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Architecture list for a detected compute capability.
///
/// Capability 12 and newer cards run kernels built for older architectures,
/// so they get the wide list; older cards get exactly their own
/// architecture since building extra ones only slows the compile down.
pub fn arch_flags(major: u32, minor: u32) -> Vec<String> {
    if major >= 12 {
        vec!["8.6".into(), "8.9".into(), "9.0".into(), format!("{major}.{minor}")]
    } else {
        vec![format!("{major}.{minor}")]
    }
}

/// Try candidate revisions in order, fresh clone each, first success wins.
pub async fn build_with_fallback<R: BuildRunner>(runner: &R, spec: &BuildSpec) -> BuildReport {
    let mut report = BuildReport::default();
    if let Err(e) = tokio::fs::create_dir_all(&spec.log_dir).await {
        tracing::error!(error = %e, "cannot create build log dir");
        return report;
    }

    for revision in &spec.revisions {
        let log_path = spec.log_dir.join(format!("build-{revision}.log"));
        tracing::info!(%revision, log = %log_path.display(), "building extension");

        let outcome = match runner.checkout(&spec.repo_url, revision, &spec.workdir).await {
            Ok(()) => match runner.compile(&spec.workdir, &spec.arch_flags, &log_path).await {
                Ok(()) => BuildOutcome::Succeeded,
                Err(message) => BuildOutcome::Failed { message },
            },
            Err(message) => BuildOutcome::Failed { message },
        };

        let succeeded = outcome == BuildOutcome::Succeeded;
        if let BuildOutcome::Failed { message } = &outcome {
            tracing::warn!(%revision, %message, "extension build attempt failed");
        }
        report.attempts.push(BuildAttempt { revision: revision.clone(), log_path, outcome });
        if succeeded {
            tracing::info!(%revision, "extension built");
            return report;
        }
    }

    tracing::warn!("all extension revisions failed, continuing without it");
    report
}

/// Run the fallback build as a background task.
pub fn spawn_build<R: BuildRunner>(runner: R, spec: BuildSpec) -> JoinHandle<BuildReport> {
    tokio::spawn(async move { build_with_fallback(&runner, &spec).await })
}

/// Bounded poll-join of a spawned build.
///
/// Returns `None` when the deadline passes first; the build task keeps
/// running and is simply no longer waited for, matching the
/// degrade-not-abort policy.
pub async fn join_build(
    handle: JoinHandle<BuildReport>,
    deadline: Duration,
    poll: Duration,
) -> Option<BuildReport> {
    let started = std::time::Instant::now();
    while !handle.is_finished() {
        if started.elapsed() >= deadline {
            tracing::warn!("extension build still running at join deadline");
            return None;
        }
        tokio::time::sleep(poll).await;
    }
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(error = %e, "extension build task aborted");
            None
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::BuildRunner;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::Arc;

    /// Scripted build runner; revisions fail when registered, compile logs
    /// are written for every attempt either way.
    #[derive(Clone, Default)]
    pub struct FakeBuildRunner {
        failing: Arc<Mutex<BTreeSet<String>>>,
        checkouts: Arc<Mutex<Vec<String>>>,
    }

    impl FakeBuildRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_revision(&self, revision: &str) {
            self.failing.lock().insert(revision.to_string());
        }

        pub fn checkouts(&self) -> Vec<String> {
            self.checkouts.lock().clone()
        }
    }

    #[async_trait]
    impl BuildRunner for FakeBuildRunner {
        async fn checkout(&self, _url: &str, revision: &str, _dest: &Path) -> Result<(), String> {
            self.checkouts.lock().push(revision.to_string());
            Ok(())
        }

        async fn compile(
            &self,
            _dir: &Path,
            _arch_flags: &[String],
            log: &Path,
        ) -> Result<(), String> {
            let failing = {
                let set = self.failing.lock();
                log.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .map(|name| set.iter().any(|rev| name.contains(rev.as_str())))
                    .unwrap_or(false)
            };
            let text = if failing { "error: nvcc exited 1\n" } else { "built wheel\n" };
            std::fs::write(log, text).map_err(|e| e.to_string())?;
            if failing {
                return Err("nvcc exited 1".to_string());
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBuildRunner;

#[cfg(test)]
#[path = "extension_tests.rs"]
mod tests;
