// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrow client interface to the transfer backend.
//!
//! The backend is a collaborator process with its own job table and
//! concurrency cap; the orchestrator reaches it only through this interface
//! (`add_job`, `query_status`, `counts`, `cancel_job`, `purge_results`) and
//! never mutates its state directly.

use async_trait::async_trait;
use rigup_core::JobState;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::TransferError;

/// Options for one segmented transfer, mapped onto backend input options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub dir: PathBuf,
    pub out: String,
    pub segments: u32,
    pub max_conn_per_host: u32,
    pub min_segment_size: String,
    /// Reuse partial bytes from a previous attempt instead of restarting
    /// from zero. The backend discards partials it cannot validate.
    pub resume: bool,
    /// Full header line, e.g. `Authorization: Bearer …`; attached only when
    /// the destination host demands it.
    pub auth_header: Option<String>,
    pub checksum: Option<String>,
}

impl TransferOptions {
    /// Backend option map. The backend's option values are all strings.
    pub fn to_backend_options(&self) -> Value {
        let mut opts = serde_json::Map::new();
        opts.insert("dir".into(), json!(self.dir.display().to_string()));
        opts.insert("out".into(), json!(self.out));
        opts.insert("split".into(), json!(self.segments.to_string()));
        opts.insert("max-connection-per-server".into(), json!(self.max_conn_per_host.to_string()));
        opts.insert("min-split-size".into(), json!(self.min_segment_size));
        opts.insert("continue".into(), json!(if self.resume { "true" } else { "false" }));
        if let Some(header) = &self.auth_header {
            opts.insert("header".into(), json!(header));
        }
        if let Some(checksum) = &self.checksum {
            opts.insert("checksum".into(), json!(format!("sha-256={}", checksum)));
        }
        Value::Object(opts)
    }
}

/// Opaque handle for an enqueued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub gid: String,
    pub url: String,
    pub dest: PathBuf,
}

/// Point-in-time status of one backend job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStatus {
    pub gid: String,
    pub state: JobState,
    pub total: u64,
    pub completed: u64,
    pub speed: u64,
    pub error: Option<String>,
}

/// Backend-wide queue occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub active: usize,
    pub waiting: usize,
}

impl QueueCounts {
    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.waiting == 0
    }
}

/// Client for the transfer backend's control protocol
#[async_trait]
pub trait TransferClient: Clone + Send + Sync + 'static {
    /// Enqueue a transfer; returns the backend job id without blocking on
    /// the transfer itself.
    async fn add_job(&self, url: &str, options: &TransferOptions) -> Result<String, TransferError>;

    async fn query_status(&self, gid: &str) -> Result<TransferStatus, TransferError>;

    async fn counts(&self) -> Result<QueueCounts, TransferError>;

    /// Force-remove a job whether active or waiting.
    async fn cancel_job(&self, gid: &str) -> Result<(), TransferError>;

    /// Clear completed/failed/removed result records from the backend so
    /// the next run starts from a clean job table.
    async fn purge_results(&self) -> Result<(), TransferError>;
}

/// Wire shape of a backend status response (numeric fields are strings).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStatus {
    pub gid: String,
    pub status: String,
    #[serde(default)]
    pub total_length: Option<String>,
    #[serde(default)]
    pub completed_length: Option<String>,
    #[serde(default)]
    pub download_speed: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RawStatus {
    pub fn into_status(self) -> Result<TransferStatus, TransferError> {
        let state = match self.status.as_str() {
            "active" => JobState::Active,
            "waiting" | "paused" => JobState::Queued,
            "complete" => JobState::Complete,
            "error" => JobState::Failed,
            "removed" => JobState::Removed,
            other => {
                return Err(TransferError::Protocol(format!("unknown job status: {}", other)))
            }
        };
        Ok(TransferStatus {
            gid: self.gid,
            state,
            total: parse_len(self.total_length.as_deref()),
            completed: parse_len(self.completed_length.as_deref()),
            speed: parse_len(self.download_speed.as_deref()),
            error: self.error_message.filter(|m| !m.is_empty()),
        })
    }
}

fn parse_len(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct FakeJob {
        dir: PathBuf,
        out: String,
        state: JobState,
        total: u64,
        completed: u64,
        payload: Option<Vec<u8>>,
        fail_message: Option<String>,
    }

    #[derive(Default)]
    struct FakeState {
        jobs: HashMap<String, FakeJob>,
        next_gid: u64,
        added: Vec<String>,
        cancelled: Vec<String>,
        purge_count: usize,
        payloads: HashMap<String, Vec<u8>>,
        failures: HashMap<String, String>,
        last_options: Option<TransferOptions>,
    }

    /// In-memory transfer backend for tests.
    ///
    /// Each `query_status` call advances the job one lifecycle step:
    /// queued → active → terminal. Jobs registered with [`serve`] write
    /// their payload to the destination on completion; jobs registered with
    /// [`fail_with`] end in `Failed`.
    ///
    /// [`serve`]: FakeTransferClient::serve
    /// [`fail_with`]: FakeTransferClient::fail_with
    #[derive(Clone, Default)]
    pub struct FakeTransferClient {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeTransferClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register bytes to "download" for a URL.
        pub fn serve(&self, url: &str, payload: &[u8]) {
            self.inner.lock().payloads.insert(url.to_string(), payload.to_vec());
        }

        /// Register a URL whose transfer fails.
        pub fn fail_with(&self, url: &str, message: &str) {
            self.inner.lock().failures.insert(url.to_string(), message.to_string());
        }

        /// URLs enqueued, in order.
        pub fn added_urls(&self) -> Vec<String> {
            self.inner.lock().added.clone()
        }

        pub fn cancelled_gids(&self) -> Vec<String> {
            self.inner.lock().cancelled.clone()
        }

        pub fn purge_count(&self) -> usize {
            self.inner.lock().purge_count
        }

        /// Options passed with the most recent `add_job`.
        pub fn last_options(&self) -> Option<TransferOptions> {
            self.inner.lock().last_options.clone()
        }
    }

    #[async_trait]
    impl TransferClient for FakeTransferClient {
        async fn add_job(
            &self,
            url: &str,
            options: &TransferOptions,
        ) -> Result<String, TransferError> {
            let mut state = self.inner.lock();
            state.next_gid += 1;
            let gid = format!("gid-{:04}", state.next_gid);
            let payload = state.payloads.get(url).cloned();
            let fail_message = state.failures.get(url).cloned();
            let total = payload.as_ref().map(|p| p.len() as u64).unwrap_or(1024);
            state.added.push(url.to_string());
            state.last_options = Some(options.clone());
            state.jobs.insert(
                gid.clone(),
                FakeJob {
                    dir: options.dir.clone(),
                    out: options.out.clone(),
                    state: JobState::Queued,
                    total,
                    completed: 0,
                    payload,
                    fail_message,
                },
            );
            Ok(gid)
        }

        async fn query_status(&self, gid: &str) -> Result<TransferStatus, TransferError> {
            let mut state = self.inner.lock();
            let job = state.jobs.get_mut(gid).ok_or_else(|| TransferError::Backend {
                code: 1,
                message: format!("{} is not found", gid),
            })?;

            match job.state {
                JobState::Queued => {
                    job.state = JobState::Active;
                    job.completed = job.total / 2;
                }
                JobState::Active => {
                    if let Some(message) = job.fail_message.clone() {
                        job.state = JobState::Failed;
                        return Ok(TransferStatus {
                            gid: gid.to_string(),
                            state: JobState::Failed,
                            total: job.total,
                            completed: job.completed,
                            speed: 0,
                            error: Some(message),
                        });
                    }
                    if let Some(payload) = job.payload.clone() {
                        std::fs::create_dir_all(&job.dir)?;
                        std::fs::write(job.dir.join(&job.out), payload)?;
                    }
                    job.state = JobState::Complete;
                    job.completed = job.total;
                }
                _ => {}
            }

            Ok(TransferStatus {
                gid: gid.to_string(),
                state: job.state,
                total: job.total,
                completed: job.completed,
                speed: if job.state == JobState::Active { 1_000_000 } else { 0 },
                error: None,
            })
        }

        async fn counts(&self) -> Result<QueueCounts, TransferError> {
            let state = self.inner.lock();
            let active =
                state.jobs.values().filter(|j| j.state == JobState::Active).count();
            let waiting =
                state.jobs.values().filter(|j| j.state == JobState::Queued).count();
            Ok(QueueCounts { active, waiting })
        }

        async fn cancel_job(&self, gid: &str) -> Result<(), TransferError> {
            let mut state = self.inner.lock();
            let Some(job) = state.jobs.get_mut(gid) else {
                return Err(TransferError::Backend {
                    code: 1,
                    message: format!("{} is not found", gid),
                });
            };
            if job.state.is_terminal() {
                return Err(TransferError::Backend {
                    code: 1,
                    message: format!("{} cannot be removed", gid),
                });
            }
            job.state = JobState::Removed;
            state.cancelled.push(gid.to_string());
            Ok(())
        }

        async fn purge_results(&self) -> Result<(), TransferError> {
            let mut state = self.inner.lock();
            state.purge_count += 1;
            state.jobs.retain(|_, j| !j.state.is_terminal());
            Ok(())
        }
    }

}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransferClient;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
