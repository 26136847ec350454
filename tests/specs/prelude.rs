// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared imports and helpers for the integration specs.

pub use rigup_core::{ProvisionConfig, RepoTarget};
pub use std::path::Path;
pub use std::time::Duration;
pub use tempfile::TempDir;

/// A config rooted in a fresh temporary directory.
pub fn test_config() -> (TempDir, ProvisionConfig) {
    let tmp = TempDir::new().unwrap();
    let config = ProvisionConfig::for_root(tmp.path());
    (tmp, config)
}

/// Fast poll interval for queue and monitor loops under test.
pub const FAST_POLL: Duration = Duration::from_millis(5);
