// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue-level orchestration: bulk enqueue from a manifest, the polling
//! wait loop, and run-scoped cleanup of the backend's job table.

use rigup_core::JobState;
use rigup_manifest::ResolvedManifest;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::client::{JobHandle, TransferClient};
use crate::fetch::{FetchOutcome, Fetcher, HostProbe};
use crate::progress::{ItemProgress, RecentLedger, Snapshot};
use crate::TransferError;

/// Consecutive idle backend polls required before the wait loop gives up
/// waiting on handles it can no longer observe.
const IDLE_POLLS_TO_STOP: u32 = 2;

/// Bulk enqueue and supervision over the transfer backend's queue.
pub struct DownloadQueue<T: TransferClient, P: HostProbe> {
    client: T,
    fetcher: Fetcher<T, P>,
}

/// Outcome of waiting a whole queue out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub completed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl QueueReport {
    /// True when every observed job completed.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<T: TransferClient, P: HostProbe> DownloadQueue<T, P> {
    pub fn new(client: T, fetcher: Fetcher<T, P>) -> Self {
        Self { client, fetcher }
    }

    /// Enqueue every entry of the manifest's enabled sections.
    ///
    /// Sections absent from `enabled` are skipped wholesale. A destination
    /// that already holds a plausible file is skipped per-entry; a failed
    /// enqueue fails the whole call since it means the backend itself is
    /// unhealthy.
    pub async fn enqueue_manifest(
        &self,
        manifest: &ResolvedManifest,
        enabled: &BTreeSet<String>,
    ) -> Result<Vec<JobHandle>, TransferError> {
        let mut handles = Vec::new();
        for section in &manifest.sections {
            if !enabled.contains(section.kind.name()) {
                tracing::debug!(section = section.kind.name(), "section disabled, skipping");
                continue;
            }
            tracing::info!(
                section = section.kind.name(),
                entries = section.entries.len(),
                "enqueueing section"
            );
            for entry in &section.entries {
                if let Some(parent) = entry.dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                match self.fetcher.fetch(&entry.url, &entry.dest, None).await? {
                    FetchOutcome::Enqueued(handle) => handles.push(handle),
                    FetchOutcome::Skipped => {}
                }
            }
        }
        Ok(handles)
    }

    /// Poll until every handle reaches a terminal state.
    ///
    /// Each cycle queries every non-terminal handle, logs a progress
    /// snapshot, and records terminal transitions exactly once. A handle
    /// whose status query errors is treated as failed rather than blocking
    /// the loop forever. As a second stop condition the loop ends after the
    /// backend reports an idle queue on consecutive polls, which covers
    /// jobs purged out from under us.
    pub async fn wait_all(
        &self,
        handles: &[JobHandle],
        poll: Duration,
    ) -> Result<QueueReport, TransferError> {
        let mut ledger = RecentLedger::new();
        let mut states: Vec<JobState> = vec![JobState::Queued; handles.len()];
        let mut idle_polls = 0u32;

        while !handles.is_empty() {
            let mut items = Vec::with_capacity(handles.len());
            for (i, handle) in handles.iter().enumerate() {
                if states[i].is_terminal() {
                    continue;
                }
                let name = item_name(handle);
                match self.client.query_status(&handle.gid).await {
                    Ok(status) => {
                        states[i] = status.state;
                        if status.state.is_terminal() {
                            ledger.record(
                                &handle.gid,
                                &name,
                                status.state,
                                status.error.as_deref(),
                            );
                            if let Some(error) = &status.error {
                                tracing::warn!(name = %name, %error, "transfer failed");
                            }
                        }
                        items.push(ItemProgress {
                            name,
                            state: status.state,
                            total: status.total,
                            completed: status.completed,
                            speed: status.speed,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(name = %name, error = %e, "status query failed");
                        states[i] = JobState::Failed;
                        ledger.record(&handle.gid, &name, JobState::Failed, Some(&e.to_string()));
                    }
                }
            }

            if states.iter().all(|s| s.is_terminal()) {
                break;
            }

            let snapshot = Snapshot { items };
            tracing::info!("\n{}", snapshot.render());

            match self.client.counts().await {
                Ok(counts) if counts.is_idle() => {
                    idle_polls += 1;
                    if idle_polls >= IDLE_POLLS_TO_STOP {
                        tracing::warn!(
                            "backend queue idle with transfers unaccounted for, stopping wait"
                        );
                        break;
                    }
                }
                Ok(_) => idle_polls = 0,
                Err(e) => {
                    tracing::warn!(error = %e, "queue stat query failed");
                    idle_polls = 0;
                }
            }

            tokio::time::sleep(poll).await;
        }

        Ok(QueueReport {
            completed: ledger.completed().map(str::to_string).collect(),
            failed: ledger
                .failed()
                .map(|(n, r)| (n.to_string(), r.to_string()))
                .collect(),
        })
    }

    /// Cancel whatever is still live and clear the backend's result table.
    ///
    /// Used on interrupt and at the end of a run so a later run starts
    /// against an empty job table. Cancelling is best-effort per handle:
    /// finished or unknown jobs make the backend object, which is logged
    /// and skipped; the purge still runs.
    pub async fn purge_all(&self, handles: &[JobHandle]) -> Result<(), TransferError> {
        for handle in handles {
            if let Err(e) = self.client.cancel_job(&handle.gid).await {
                tracing::debug!(gid = %handle.gid, error = %e, "cancel declined");
            }
        }
        self.client.purge_results().await
    }
}

fn item_name(handle: &JobHandle) -> String {
    handle
        .dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| handle.url.clone())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
