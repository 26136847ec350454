// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance health monitoring loop.
//!
//! One task per worker, each on its own cadence, watching process
//! liveness and endpoint responsiveness. Transitions are one-directional
//! and alerts fire at most once per instance: the `was_up` latch keeps a
//! worker that never came up from alerting at all, and the alert latch
//! keeps a flapping endpoint from alerting repeatedly.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use rigup_core::{HealthState, InstanceSpec};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::notify::NotifyAdapter;
use crate::probe::HealthProbe;

/// Liveness check for a supervised pid.
pub trait ProcessWatch: Clone + Send + Sync + 'static {
    fn alive(&self, pid: i32) -> bool;
}

/// Signal-0 probe of the worker's process group leader.
#[derive(Clone, Copy, Default)]
pub struct NixProcessWatch;

impl ProcessWatch for NixProcessWatch {
    fn alive(&self, pid: i32) -> bool {
        kill(Pid::from_raw(pid), None).is_ok()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub poll: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { poll: Duration::from_secs(10) }
    }
}

/// Watch one worker until its process dies. Returns the terminal state.
///
/// The loop never restarts anything; a dead or unresponsive worker is
/// surfaced to the operator and otherwise left as-is.
pub async fn monitor<P, W, N>(
    spec: InstanceSpec,
    pid: i32,
    probe: P,
    watch: W,
    notify: N,
    config: MonitorConfig,
) -> HealthState
where
    P: HealthProbe,
    W: ProcessWatch,
    N: NotifyAdapter,
{
    let mut state = HealthState::Starting;
    let mut was_up = false;
    let mut alerted = false;

    loop {
        if !watch.alive(pid) {
            if state.can_transition_to(HealthState::Dead) {
                state = HealthState::Dead;
            }
            tracing::warn!(name = %spec.name, pid, "worker process gone");
            if was_up && !alerted {
                let _ = notify
                    .notify(
                        &format!("{} became unresponsive", spec.name),
                        &format!("process {} on port {} is gone", pid, spec.port),
                    )
                    .await;
            }
            return state;
        }

        if probe.is_up(spec.port).await {
            was_up = true;
            if state == HealthState::Starting {
                state = HealthState::Ready;
            }
            if state.can_transition_to(HealthState::Live) {
                state = HealthState::Live;
            }
        } else if was_up && !alerted {
            alerted = true;
            if state.can_transition_to(HealthState::Degraded) {
                state = HealthState::Degraded;
            }
            tracing::warn!(name = %spec.name, port = spec.port, "worker stopped answering");
            let _ = notify
                .notify(
                    &format!("{} became unresponsive", spec.name),
                    &format!("port {} stopped answering", spec.port),
                )
                .await;
        }

        tokio::time::sleep(config.poll).await;
    }
}

/// Fire-and-forget monitor task for one launched worker.
pub fn spawn_monitor<P, W, N>(
    spec: InstanceSpec,
    pid: i32,
    probe: P,
    watch: W,
    notify: N,
    config: MonitorConfig,
) -> JoinHandle<HealthState>
where
    P: HealthProbe,
    W: ProcessWatch,
    N: NotifyAdapter,
{
    tokio::spawn(monitor(spec, pid, probe, watch, notify, config))
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::ProcessWatch;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Scripted liveness: per-pid queue of answers, then permanently dead.
    #[derive(Clone, Default)]
    pub struct FakeProcessWatch {
        scripted: Arc<Mutex<HashMap<i32, VecDeque<bool>>>>,
    }

    impl FakeProcessWatch {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(&self, pid: i32, responses: &[bool]) {
            self.scripted.lock().entry(pid).or_default().extend(responses.iter().copied());
        }
    }

    impl ProcessWatch for FakeProcessWatch {
        fn alive(&self, pid: i32) -> bool {
            self.scripted
                .lock()
                .get_mut(&pid)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(false)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProcessWatch;

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
