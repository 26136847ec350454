// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin repository convergence specs: a fresh rig clones everything, a
//! re-run updates in place, and one broken remote never takes the rest of
//! the tree down with it.

use crate::prelude::*;
use rigup_core::{SetupOutcome, SyncOutcome};
use rigup_manifest::resolve_repo_list;
use rigup_sync::{FakeInstaller, FakeVcs, RepoSyncManager};

const PLUGIN_LIST: &str = "\
# per-rig plugin set
https://github.com/ltdrdata/ComfyUI-Manager
https://github.com/cubiq/ComfyUI_essentials

https://github.com/kijai/ComfyUI-KJNodes.git
";

fn targets_from_list(root: &Path) -> Vec<RepoTarget> {
    let list = root.join("plugins.txt");
    std::fs::write(&list, PLUGIN_LIST).unwrap();
    resolve_repo_list(Some(&list), None).unwrap()
}

/// Fresh rig: every listed plugin is cloned and has its dependencies
/// installed, under the configured concurrency cap.
#[tokio::test]
async fn fresh_rig_clones_and_installs_everything() {
    let (tmp, config) = test_config();
    let targets = targets_from_list(tmp.path());
    let vcs = FakeVcs::new();
    let installer = FakeInstaller::new();
    let manager = RepoSyncManager::new(vcs.clone(), installer.clone(), &config.plugins_dir);

    let report = manager.sync_all(&targets, 2).await;

    assert!(report.all_ok());
    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.sync == SyncOutcome::Cloned));
    assert_eq!(vcs.clone_calls().len(), 3);
    assert!(vcs.max_active() <= 2);
    // `.git` suffix stripped, comment and blank line ignored.
    let mut dirs: Vec<String> = report.results.iter().map(|r| r.dir_name.clone()).collect();
    dirs.sort();
    assert_eq!(dirs, ["ComfyUI-KJNodes", "ComfyUI-Manager", "ComfyUI_essentials"]);
    assert_eq!(installer.installed_repos().len(), 3);
}

/// Re-run over an already-provisioned tree updates in place, never
/// re-clones.
#[tokio::test]
async fn rerun_updates_in_place() {
    let (tmp, config) = test_config();
    let targets = targets_from_list(tmp.path());
    let vcs = FakeVcs::new();
    for target in &targets {
        vcs.seed_clone(&config.plugins_dir.join(&target.dir_name));
    }
    let manager = RepoSyncManager::new(vcs.clone(), FakeInstaller::new(), &config.plugins_dir);

    let report = manager.sync_all(&targets, 2).await;

    assert!(report.all_ok());
    assert!(report.results.iter().all(|r| r.sync == SyncOutcome::Updated));
    assert!(vcs.clone_calls().is_empty());
    assert_eq!(vcs.update_calls().len(), 3);
}

/// A repo whose remote refuses the clone is reported failed with its
/// post-sync steps skipped, while its siblings converge normally.
#[tokio::test]
async fn broken_remote_does_not_block_siblings() {
    let (tmp, config) = test_config();
    let targets = targets_from_list(tmp.path());
    let vcs = FakeVcs::new();
    vcs.fail_url("https://github.com/cubiq/ComfyUI_essentials");
    let manager = RepoSyncManager::new(vcs.clone(), FakeInstaller::new(), &config.plugins_dir);

    let report = manager.sync_all(&targets, 2).await;

    assert_eq!(report.hard_failures(), 1);
    let broken = report
        .results
        .iter()
        .find(|r| r.dir_name == "ComfyUI_essentials")
        .unwrap();
    assert!(broken.sync.is_failure());
    assert_eq!(broken.deps, SetupOutcome::Skipped);
    assert_eq!(broken.setup, SetupOutcome::Skipped);
    assert_eq!(vcs.clone_calls().len(), 2);
}
