// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Download job model.
//!
//! A job is identified by its destination path: at most one in-flight
//! transfer may target a given path, and a path already holding a file of
//! plausible size is treated as satisfied and never re-queued.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest file size considered a real artifact. Anything below this is
/// treated as a placeholder or truncated partial and re-queued.
pub const MIN_PLAUSIBLE_BYTES: u64 = 1024;

/// Lifecycle of a download job as reported by the transfer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Active,
    Complete,
    Failed,
    Removed,
}

impl JobState {
    /// Terminal states are immutable for the rest of the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed | JobState::Removed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Active => "active",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
            JobState::Removed => "removed",
        };
        write!(f, "{}", s)
    }
}

/// Whether a destination path already holds a plausible artifact.
pub fn dest_satisfied(dest: &Path) -> bool {
    std::fs::metadata(dest).map(|m| m.is_file() && m.len() >= MIN_PLAUSIBLE_BYTES).unwrap_or(false)
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
