// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain_https    = { "https://github.com/acme/ComfyUI-Manager", "ComfyUI-Manager" },
    dot_git_suffix = { "https://github.com/acme/rgthree-comfy.git", "rgthree-comfy" },
    trailing_slash = { "https://github.com/acme/was-node-suite/", "was-node-suite" },
    ssh_style      = { "git@github.com:acme/impact-pack.git", "impact-pack" },
)]
fn dir_name_derivation(url: &str, expected: &str) {
    assert_eq!(dir_name_from_url(url), expected);
}

#[test]
fn from_url_sets_conventional_steps() {
    let target = RepoTarget::from_url("https://github.com/acme/ComfyUI-Manager.git");
    assert_eq!(target.dir_name, "ComfyUI-Manager");
    assert!(!target.recursive);
    assert_eq!(target.requirements.as_deref(), Some(std::path::Path::new("requirements.txt")));
    assert_eq!(target.setup_script.as_deref(), Some(std::path::Path::new("install.py")));
}

#[test]
fn with_recursive_flags_submodule_clone() {
    let target = RepoTarget::from_url("https://github.com/acme/deep.git").with_recursive();
    assert!(target.recursive);
}

#[test]
fn only_sync_failures_are_hard() {
    let failed = RepoSyncResult {
        dir_name: "a".into(),
        sync: SyncOutcome::Failed { message: "network".into() },
        deps: SetupOutcome::Skipped,
        setup: SetupOutcome::Skipped,
    };
    assert!(failed.hard_failed());

    let deps_failed = RepoSyncResult {
        dir_name: "b".into(),
        sync: SyncOutcome::Updated,
        deps: SetupOutcome::Failed,
        setup: SetupOutcome::Failed,
    };
    assert!(!deps_failed.hard_failed());
}
