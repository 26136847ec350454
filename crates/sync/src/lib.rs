// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rigup-sync: repository sync pool, bundle cache, native extension builds.
//!
//! Everything here converges local state toward remote state. Git, pip and
//! the native compiler run as subprocesses; this crate owns the bounded
//! concurrency, fallback ordering and atomic-install plumbing around them.

mod bundle;
mod error;
mod extension;
mod proc;
mod repo;

pub use bundle::{
    collect_manifest, signature_from_versions, BlobStore, BundleCache, HttpBlobStore,
    LocalBlobStore,
};
pub use error::SyncError;
pub use extension::{
    arch_flags, build_with_fallback, detect_compute_capability, join_build, spawn_build,
    BuildAttempt, BuildOutcome, BuildReport, BuildRunner, BuildSpec, GitBuildRunner,
};
pub use repo::{
    detect_runtime_versions, DepInstaller, GitCli, PipInstaller, RepoHead, RepoSyncManager,
    SyncReport, Vcs,
};

#[cfg(any(test, feature = "test-support"))]
pub use extension::FakeBuildRunner;
#[cfg(any(test, feature = "test-support"))]
pub use repo::{FakeInstaller, FakeVcs};
