// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rigup-core: domain types for the GPU rig provisioning orchestrator.

pub mod bundle;
pub mod clock;
pub mod config;
pub mod download;
pub mod instance;
pub mod repo;

pub use bundle::{BundleKey, BundleManifest, RepoManifestEntry};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use clock::{Clock, SystemClock};
pub use config::{
    ConfigError, ExtensionConfig, HostTuning, InstanceLayout, NetTuning, ProvisionConfig,
    RpcConfig, TelegramConfig, WorkerCommand,
};
pub use download::{dest_satisfied, JobState, MIN_PLAUSIBLE_BYTES};
pub use instance::{GpuAssignment, HealthState, InstanceSpec};
pub use repo::{RepoSyncResult, RepoTarget, SetupOutcome, SyncOutcome};
