// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-concurrency repository sync pool.
//!
//! Each target is converged independently: clone when absent, otherwise
//! fetch and hard-reset to the remote default branch. Remote state wins
//! over local drift for every managed directory; these checkouts never
//! carry local edits. Dependency install and setup scripts run after a
//! successful sync and are best-effort per repo.

use async_trait::async_trait;
use rigup_core::{RepoSyncResult, RepoTarget, SetupOutcome, SyncOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::proc::{run_checked, run_with_timeout, GIT_TIMEOUT, PIP_TIMEOUT};
use crate::SyncError;

/// Origin/branch/commit of a checked-out repository head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHead {
    pub origin: String,
    pub branch: String,
    pub commit: String,
}

/// Version-control operations the sync pool needs. Errors are plain
/// messages; they land in [`SyncOutcome::Failed`] verbatim.
#[async_trait]
pub trait Vcs: Clone + Send + Sync + 'static {
    async fn is_cloned(&self, dir: &Path) -> bool;
    async fn clone_repo(&self, url: &str, dir: &Path, recursive: bool) -> Result<(), String>;
    /// Fetch and hard-reset to the remote default branch.
    async fn update(&self, dir: &Path) -> Result<(), String>;
    async fn head_info(&self, dir: &Path) -> Result<RepoHead, String>;
}

/// Git over subprocess.
#[derive(Clone, Default)]
pub struct GitCli;

impl GitCli {
    async fn git(&self, args: &[&str], label: &str) -> Result<String, String> {
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(args).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
        let output =
            run_checked(cmd, GIT_TIMEOUT, label).await.map_err(|e| e.to_string())?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn is_cloned(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    async fn clone_repo(&self, url: &str, dir: &Path, recursive: bool) -> Result<(), String> {
        let dir_str = dir.display().to_string();
        let mut args = vec!["clone"];
        if recursive {
            args.push("--recursive");
        }
        args.push(url);
        args.push(&dir_str);
        self.git(&args, "git clone").await.map(|_| ())
    }

    async fn update(&self, dir: &Path) -> Result<(), String> {
        let dir_str = dir.display().to_string();
        self.git(&["-C", &dir_str, "fetch", "origin"], "git fetch").await?;
        self.git(&["-C", &dir_str, "reset", "--hard", "origin/HEAD"], "git reset").await.map(|_| ())
    }

    async fn head_info(&self, dir: &Path) -> Result<RepoHead, String> {
        let dir_str = dir.display().to_string();
        let origin =
            self.git(&["-C", &dir_str, "config", "--get", "remote.origin.url"], "git config").await?;
        let branch =
            self.git(&["-C", &dir_str, "rev-parse", "--abbrev-ref", "HEAD"], "git rev-parse").await?;
        let commit = self.git(&["-C", &dir_str, "rev-parse", "HEAD"], "git rev-parse").await?;
        Ok(RepoHead { origin, branch, commit })
    }
}

/// Post-sync steps. Implementations decide whether the step applies (file
/// present) and report [`SetupOutcome::Skipped`] when it does not.
#[async_trait]
pub trait DepInstaller: Clone + Send + Sync + 'static {
    async fn install_manifest(&self, repo_dir: &Path, manifest: &Path) -> SetupOutcome;
    async fn run_setup(&self, repo_dir: &Path, script: &Path) -> SetupOutcome;
}

/// pip + interpreter over subprocess.
#[derive(Clone)]
pub struct PipInstaller {
    python: PathBuf,
}

impl PipInstaller {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self { python: python.into() }
    }

    async fn run_python(&self, repo_dir: &Path, args: &[&str], label: &str) -> SetupOutcome {
        let mut cmd = tokio::process::Command::new(&self.python);
        cmd.args(args).current_dir(repo_dir);
        match run_with_timeout(cmd, PIP_TIMEOUT, label).await {
            Ok(output) if output.status.success() => SetupOutcome::Ok,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(
                    repo = %repo_dir.display(),
                    %label,
                    stderr = %stderr.trim(),
                    "post-sync step failed"
                );
                SetupOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(repo = %repo_dir.display(), %label, error = %e, "post-sync step failed");
                SetupOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl DepInstaller for PipInstaller {
    async fn install_manifest(&self, repo_dir: &Path, manifest: &Path) -> SetupOutcome {
        let file = repo_dir.join(manifest);
        if !file.exists() {
            return SetupOutcome::Skipped;
        }
        let file_str = file.display().to_string();
        self.run_python(repo_dir, &["-m", "pip", "install", "-r", &file_str], "pip install").await
    }

    async fn run_setup(&self, repo_dir: &Path, script: &Path) -> SetupOutcome {
        let file = repo_dir.join(script);
        if !file.exists() {
            return SetupOutcome::Skipped;
        }
        let file_str = file.display().to_string();
        self.run_python(repo_dir, &[&file_str], "setup script").await
    }
}

/// Aggregate over one sync pass. Result order is completion order, which
/// is unspecified.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub results: Vec<RepoSyncResult>,
}

impl SyncReport {
    pub fn hard_failures(&self) -> usize {
        self.results.iter().filter(|r| r.hard_failed()).count()
    }

    pub fn all_ok(&self) -> bool {
        self.hard_failures() == 0
    }
}

/// Worker pool converging a set of repo targets under a shared root.
pub struct RepoSyncManager<V: Vcs, D: DepInstaller> {
    vcs: V,
    installer: D,
    root: PathBuf,
}

impl<V: Vcs, D: DepInstaller> RepoSyncManager<V, D> {
    pub fn new(vcs: V, installer: D, root: impl Into<PathBuf>) -> Self {
        Self { vcs, installer, root: root.into() }
    }

    /// Sync every target with at most `limit` jobs in flight. No fail-fast:
    /// every target is attempted and failures are aggregated in the report.
    pub async fn sync_all(&self, targets: &[RepoTarget], limit: usize) -> SyncReport {
        let semaphore = Arc::new(Semaphore::new(limit.max(1)));
        let mut set: JoinSet<RepoSyncResult> = JoinSet::new();

        for target in targets.iter().cloned() {
            let vcs = self.vcs.clone();
            let installer = self.installer.clone();
            let dir = self.root.join(&target.dir_name);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                // Closed only when the pool itself is dropped mid-run.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return RepoSyncResult {
                            dir_name: target.dir_name.clone(),
                            sync: SyncOutcome::Failed { message: "sync pool shut down".into() },
                            deps: SetupOutcome::Skipped,
                            setup: SetupOutcome::Skipped,
                        }
                    }
                };
                sync_one(&vcs, &installer, &target, &dir).await
            });
        }

        let mut report = SyncReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => {
                    if result.hard_failed() {
                        tracing::error!(repo = %result.dir_name, outcome = ?result.sync, "repo sync failed");
                    } else {
                        tracing::info!(repo = %result.dir_name, outcome = ?result.sync, "repo synced");
                    }
                    report.results.push(result);
                }
                Err(e) => tracing::error!(error = %e, "sync task aborted"),
            }
        }
        report
    }

    pub async fn head_info(&self, target: &RepoTarget) -> Result<RepoHead, String> {
        self.vcs.head_info(&self.root.join(&target.dir_name)).await
    }
}

async fn sync_one<V: Vcs, D: DepInstaller>(
    vcs: &V,
    installer: &D,
    target: &RepoTarget,
    dir: &Path,
) -> RepoSyncResult {
    let sync = if vcs.is_cloned(dir).await {
        match vcs.update(dir).await {
            Ok(()) => SyncOutcome::Updated,
            Err(message) => SyncOutcome::Failed { message },
        }
    } else {
        match vcs.clone_repo(&target.url, dir, target.recursive).await {
            Ok(()) => SyncOutcome::Cloned,
            Err(message) => SyncOutcome::Failed { message },
        }
    };

    if sync.is_failure() {
        return RepoSyncResult {
            dir_name: target.dir_name.clone(),
            sync,
            deps: SetupOutcome::Skipped,
            setup: SetupOutcome::Skipped,
        };
    }

    let deps = match &target.requirements {
        Some(manifest) => installer.install_manifest(dir, manifest).await,
        None => SetupOutcome::Skipped,
    };
    let setup = match &target.setup_script {
        Some(script) => installer.run_setup(dir, script).await,
        None => SetupOutcome::Skipped,
    };

    RepoSyncResult { dir_name: target.dir_name.clone(), sync, deps, setup }
}

/// Installed GPU-runtime package versions, in interpreter-reported order.
///
/// Missing packages are omitted rather than erroring so a partially
/// provisioned environment still gets a stable signature.
pub async fn detect_runtime_versions(python: &Path) -> Result<Vec<(String, String)>, SyncError> {
    const PROGRAM: &str = "\
import importlib.metadata as m
for name in (\"torch\", \"torchvision\", \"torchaudio\"):
    try:
        print(f\"{name}={m.version(name)}\")
    except m.PackageNotFoundError:
        pass
";
    let mut cmd = tokio::process::Command::new(python);
    cmd.args(["-c", PROGRAM]);
    let output = run_checked(cmd, GIT_TIMEOUT, "version probe").await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect())
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{DepInstaller, RepoHead, Vcs};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rigup_core::SetupOutcome;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeVcsState {
        cloned: BTreeSet<PathBuf>,
        clone_calls: Vec<String>,
        update_calls: Vec<PathBuf>,
        failing_urls: BTreeSet<String>,
        active: usize,
        max_active: usize,
    }

    /// In-memory VCS with an instrumented concurrency gauge.
    #[derive(Clone, Default)]
    pub struct FakeVcs {
        inner: Arc<Mutex<FakeVcsState>>,
    }

    impl FakeVcs {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pretend `dir` already holds a checkout.
        pub fn seed_clone(&self, dir: &Path) {
            self.inner.lock().cloned.insert(dir.to_path_buf());
        }

        /// Make clones of `url` fail.
        pub fn fail_url(&self, url: &str) {
            self.inner.lock().failing_urls.insert(url.to_string());
        }

        pub fn clone_calls(&self) -> Vec<String> {
            self.inner.lock().clone_calls.clone()
        }

        pub fn update_calls(&self) -> Vec<PathBuf> {
            self.inner.lock().update_calls.clone()
        }

        /// Highest number of clone/update operations observed in flight.
        pub fn max_active(&self) -> usize {
            self.inner.lock().max_active
        }

        fn enter(&self) {
            let mut state = self.inner.lock();
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
        }

        fn exit(&self) {
            self.inner.lock().active -= 1;
        }

        /// Hold the gauge open long enough for overlap to be observable.
        async fn work(&self) {
            self.enter();
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.exit();
        }
    }

    #[async_trait]
    impl Vcs for FakeVcs {
        async fn is_cloned(&self, dir: &Path) -> bool {
            self.inner.lock().cloned.contains(dir)
        }

        async fn clone_repo(&self, url: &str, dir: &Path, _recursive: bool) -> Result<(), String> {
            self.work().await;
            let failing = self.inner.lock().failing_urls.contains(url);
            if failing {
                return Err(format!("clone of {} refused", url));
            }
            let mut state = self.inner.lock();
            state.clone_calls.push(url.to_string());
            state.cloned.insert(dir.to_path_buf());
            Ok(())
        }

        async fn update(&self, dir: &Path) -> Result<(), String> {
            self.work().await;
            self.inner.lock().update_calls.push(dir.to_path_buf());
            Ok(())
        }

        async fn head_info(&self, dir: &Path) -> Result<RepoHead, String> {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(RepoHead {
                origin: format!("https://example.com/{name}.git"),
                branch: "main".to_string(),
                commit: format!("{name}-commit"),
            })
        }
    }

    /// Scripted installer; unscripted repos succeed.
    #[derive(Clone, Default)]
    pub struct FakeInstaller {
        outcomes: Arc<Mutex<BTreeMap<PathBuf, SetupOutcome>>>,
        installs: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl FakeInstaller {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_outcome(&self, repo_dir: &Path, outcome: SetupOutcome) {
            self.outcomes.lock().insert(repo_dir.to_path_buf(), outcome);
        }

        pub fn installed_repos(&self) -> Vec<PathBuf> {
            self.installs.lock().clone()
        }
    }

    #[async_trait]
    impl DepInstaller for FakeInstaller {
        async fn install_manifest(&self, repo_dir: &Path, _manifest: &Path) -> SetupOutcome {
            self.installs.lock().push(repo_dir.to_path_buf());
            self.outcomes.lock().get(repo_dir).copied().unwrap_or(SetupOutcome::Ok)
        }

        async fn run_setup(&self, repo_dir: &Path, _script: &Path) -> SetupOutcome {
            self.outcomes.lock().get(repo_dir).copied().unwrap_or(SetupOutcome::Ok)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInstaller, FakeVcs};

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
