// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rigup-supervise: worker launch, readiness probing and health monitoring.
//!
//! The supervisor is observational, not gating: a worker that never comes
//! up is reported and left alone, a worker that dies is reported and not
//! restarted. Remediation belongs to the operator.

mod error;
mod launch;
mod monitor;
mod notify;
mod probe;

pub use error::LaunchError;
pub use launch::{InstanceHandle, Launcher, ReadyOutcome};
pub use monitor::{spawn_monitor, MonitorConfig, NixProcessWatch, ProcessWatch};
pub use notify::{NoopNotifyAdapter, NotifyAdapter, NotifyError, TelegramNotifyAdapter};
pub use probe::{HealthProbe, HttpHealthProbe};

#[cfg(any(test, feature = "test-support"))]
pub use monitor::FakeProcessWatch;
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use probe::FakeHealthProbe;
