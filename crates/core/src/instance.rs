// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker instance specs and the health state machine.
//!
//! One instance per port; distinct instances never share output or cache
//! directories. Health transitions are one-directional — there is no
//! `Dead → Live` recovery path; the supervisor alerts, it does not restart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// GPU binding for one worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuAssignment {
    /// All visible devices.
    All,
    /// A single device by index.
    Id(u32),
}

impl GpuAssignment {
    /// Value for the `CUDA_VISIBLE_DEVICES` mask, `None` meaning unrestricted.
    pub fn visible_devices(&self) -> Option<String> {
        match self {
            GpuAssignment::All => None,
            GpuAssignment::Id(id) => Some(id.to_string()),
        }
    }
}

impl std::fmt::Display for GpuAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuAssignment::All => write!(f, "all"),
            GpuAssignment::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Launch parameters for one worker instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Session name, unique per instance.
    pub name: String,
    /// HTTP port; doubles as the instance identity.
    pub port: u16,
    pub gpu: GpuAssignment,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_file: PathBuf,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl InstanceSpec {
    /// Build the conventional per-instance spec under a workspace root.
    ///
    /// Output/cache/log paths embed the port so instances stay isolated.
    pub fn for_port(root: &std::path::Path, port: u16, gpu: GpuAssignment) -> Self {
        Self {
            name: format!("worker-{}", port),
            port,
            gpu,
            output_dir: root.join(format!("output/{}", port)),
            cache_dir: root.join(format!("cache/{}", port)),
            log_file: root.join(format!("logs/worker-{}.log", port)),
            extra_args: Vec::new(),
        }
    }
}

/// Health of a running instance.
///
/// `Starting → Ready → Live → {Degraded, Dead}`, plus `Starting → Dead` when
/// the session vanishes before the readiness probe ever succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Launched, readiness probe not yet satisfied.
    Starting,
    /// First successful probe observed.
    Ready,
    /// Steady-state: process alive and endpoint responsive.
    Live,
    /// Process alive but endpoint unresponsive.
    Degraded,
    /// Session gone. Terminal for this launch cycle.
    Dead,
}

impl HealthState {
    /// Valid one-directional transitions.
    pub fn can_transition_to(&self, next: HealthState) -> bool {
        use HealthState::*;
        matches!(
            (self, next),
            (Starting, Ready) | (Starting, Dead) | (Ready, Live) | (Ready, Dead)
                | (Live, Degraded)
                | (Live, Dead)
                | (Degraded, Dead)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HealthState::Dead)
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
