// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed repository targets.
//!
//! A target's identity is its local directory name, derived from the clone
//! URL. Targets are never deleted automatically; re-runs converge each one
//! toward the latest remote state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One plugin (or application) repository managed by the sync pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    /// Clone URL.
    pub url: String,
    /// Local directory name under the plugins root.
    pub dir_name: String,
    /// Clone with submodules.
    #[serde(default)]
    pub recursive: bool,
    /// Dependency manifest relative to the repo root, installed best-effort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<PathBuf>,
    /// Setup script relative to the repo root, run best-effort after install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_script: Option<PathBuf>,
}

impl RepoTarget {
    /// Build a target from a clone URL with the conventional best-effort
    /// setup steps (`requirements.txt`, `install.py`).
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            dir_name: dir_name_from_url(url),
            recursive: false,
            requirements: Some(PathBuf::from("requirements.txt")),
            setup_script: Some(PathBuf::from("install.py")),
        }
    }

    pub fn with_recursive(mut self) -> Self {
        self.recursive = true;
        self
    }
}

/// Derive the local directory name from a clone URL: last path segment with
/// any trailing `.git` stripped.
pub fn dir_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Hard per-repo outcome of the clone/update step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Cloned,
    Updated,
    Failed { message: String },
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

/// Best-effort outcome of a post-sync step (dependency install, setup script).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupOutcome {
    /// Step ran and exited zero.
    Ok,
    /// Step ran and failed; logged, never fatal for the repo.
    Failed,
    /// No manifest/script present.
    Skipped,
}

/// Aggregated result for one repo target after a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSyncResult {
    pub dir_name: String,
    pub sync: SyncOutcome,
    pub deps: SetupOutcome,
    pub setup: SetupOutcome,
}

impl RepoSyncResult {
    /// Only clone/update failures count toward the aggregate failure total.
    pub fn hard_failed(&self) -> bool {
        self.sync.is_failure()
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
