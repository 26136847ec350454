// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue progress snapshots and the recent-completions ledger.

use rigup_core::JobState;
use std::collections::VecDeque;
use std::fmt::Write as _;

const BAR_WIDTH: usize = 24;
const LEDGER_CAP: usize = 32;

/// Progress of a single job at one polling instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProgress {
    pub name: String,
    pub state: JobState,
    pub total: u64,
    pub completed: u64,
    /// Bytes per second as reported by the backend.
    pub speed: u64,
}

impl ItemProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed.saturating_mul(100)) / self.total).min(100) as u8
    }

    /// Whole seconds until done at the current rate, `None` when stalled.
    pub fn eta_secs(&self) -> Option<u64> {
        if self.speed == 0 || self.completed >= self.total {
            return None;
        }
        Some((self.total - self.completed).div_ceil(self.speed))
    }
}

/// Point-in-time view over every tracked job, rendered as one block so the
/// log reads as a table rather than interleaved lines.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub items: Vec<ItemProgress>,
}

impl Snapshot {
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.total).sum()
    }

    pub fn completed_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.completed).sum()
    }

    pub fn aggregate_speed(&self) -> u64 {
        self.items.iter().map(|i| i.speed).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            let line = match item.state {
                JobState::Complete => format!("{:<40} done  {}", item.name, human_bytes(item.total)),
                JobState::Failed => format!("{:<40} FAILED", item.name),
                JobState::Removed => format!("{:<40} cancelled", item.name),
                JobState::Queued => format!("{:<40} queued", item.name),
                JobState::Active => {
                    let eta = match item.eta_secs() {
                        Some(secs) => format!("{}s", secs),
                        None => "--".to_string(),
                    };
                    format!(
                        "{:<40} [{}] {:>3}%  {}/s  eta {}",
                        item.name,
                        bar(item.percent()),
                        item.percent(),
                        human_bytes(item.speed),
                        eta,
                    )
                }
            };
            let _ = writeln!(out, "{line}");
        }
        let _ = write!(
            out,
            "total {}/{} at {}/s",
            human_bytes(self.completed_bytes()),
            human_bytes(self.total_bytes()),
            human_bytes(self.aggregate_speed()),
        );
        out
    }
}

fn bar(percent: u8) -> String {
    let filled = (percent as usize * BAR_WIDTH) / 100;
    let mut s = String::with_capacity(BAR_WIDTH);
    for i in 0..BAR_WIDTH {
        s.push(if i < filled { '=' } else { ' ' });
    }
    s
}

/// Humanized byte count, binary units.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Bounded record of jobs that reached a terminal state, so each completion
/// or failure is reported exactly once across polling cycles.
#[derive(Debug, Default)]
pub struct RecentLedger {
    completed: VecDeque<String>,
    failed: VecDeque<(String, String)>,
    seen: std::collections::BTreeSet<String>,
}

impl RecentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal transition. Returns false when the gid was already
    /// recorded.
    pub fn record(&mut self, gid: &str, name: &str, state: JobState, error: Option<&str>) -> bool {
        if !self.seen.insert(gid.to_string()) {
            return false;
        }
        match state {
            JobState::Complete => {
                self.completed.push_back(name.to_string());
                if self.completed.len() > LEDGER_CAP {
                    self.completed.pop_front();
                }
            }
            JobState::Failed | JobState::Removed => {
                let reason = error.unwrap_or("cancelled").to_string();
                self.failed.push_back((name.to_string(), reason));
                if self.failed.len() > LEDGER_CAP {
                    self.failed.pop_front();
                }
            }
            _ => {
                self.seen.remove(gid);
                return false;
            }
        }
        true
    }

    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.completed.iter().map(String::as_str)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.failed.iter().map(|(n, r)| (n.as_str(), r.as_str()))
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
