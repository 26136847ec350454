// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact fetcher: idempotence check, conditional auth, enqueue.
//!
//! Fetching is a request to the transfer backend, not a synchronous
//! download: `fetch` returns a handle as soon as the backend accepts the
//! job.

use async_trait::async_trait;
use rigup_core::{config::url_host, dest_satisfied, ProvisionConfig};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::client::{JobHandle, TransferClient, TransferOptions};
use crate::TransferError;

/// Probe used to decide whether a host demands bearer authentication.
#[async_trait]
pub trait HostProbe: Clone + Send + Sync + 'static {
    /// HTTP status of an unauthenticated HEAD request, `None` when the host
    /// is unreachable (unreachable hosts are left to the backend to report).
    async fn head_status(&self, url: &str) -> Option<u16>;
}

/// Real probe over TLS.
#[derive(Clone)]
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostProbe for ReqwestProbe {
    async fn head_status(&self, url: &str) -> Option<u16> {
        match self.client.head(url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(%url, error = %e, "auth probe failed");
                None
            }
        }
    }
}

/// Result of a fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Enqueued(JobHandle),
    /// Destination already holds a plausible artifact; nothing enqueued.
    Skipped,
}

/// Enqueues single artifacts with per-host tuning and conditional auth.
#[derive(Clone)]
pub struct Fetcher<T: TransferClient, P: HostProbe> {
    client: T,
    probe: P,
    config: ProvisionConfig,
    /// Per-host auth requirement, probed once per host per run.
    auth_hosts: Arc<Mutex<HashMap<String, bool>>>,
}

impl<T: TransferClient, P: HostProbe> Fetcher<T, P> {
    pub fn new(client: T, probe: P, config: &ProvisionConfig) -> Self {
        Self { client, probe, config: config.clone(), auth_hosts: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Enqueue a resumable segmented transfer unless the destination is
    /// already satisfied.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        checksum: Option<&str>,
    ) -> Result<FetchOutcome, TransferError> {
        if dest_satisfied(dest) {
            tracing::info!(%url, dest = %dest.display(), "destination present, skipping");
            return Ok(FetchOutcome::Skipped);
        }

        let dir = dest
            .parent()
            .ok_or_else(|| TransferError::InvalidDestination(dest.to_path_buf()))?;
        let out = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidDestination(dest.to_path_buf()))?;

        let host = url_host(url).unwrap_or("");
        let tuning = self.config.tuning_for(host);

        let auth_header = if self.host_needs_auth(host, url).await {
            match &self.config.auth_token {
                Some(token) => Some(format!("Authorization: Bearer {}", token)),
                None => {
                    tracing::warn!(
                        %host,
                        "host requires authentication but no token is configured; \
                         attempting unauthenticated"
                    );
                    None
                }
            }
        } else {
            None
        };

        let options = TransferOptions {
            dir: dir.to_path_buf(),
            out,
            segments: tuning.segments,
            max_conn_per_host: tuning.max_conn_per_host,
            min_segment_size: tuning.min_segment_size.clone(),
            resume: true,
            auth_header,
            checksum: checksum.map(str::to_string),
        };

        let gid = self.client.add_job(url, &options).await?;
        tracing::info!(%url, %gid, dest = %dest.display(), "transfer enqueued");
        Ok(FetchOutcome::Enqueued(JobHandle {
            gid,
            url: url.to_string(),
            dest: dest.to_path_buf(),
        }))
    }

    /// A host needs auth when an unauthenticated probe comes back 401/403.
    /// Probed once per host; credentials are never attached to hosts that
    /// did not ask for them.
    async fn host_needs_auth(&self, host: &str, url: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        if let Some(needs) = self.auth_hosts.lock().get(host) {
            return *needs;
        }
        let needs = matches!(self.probe.head_status(url).await, Some(401 | 403));
        self.auth_hosts.lock().insert(host.to_string(), needs);
        needs
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::HostProbe;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Scripted probe for tests. Unregistered hosts answer 200.
    #[derive(Clone, Default)]
    pub struct FakeProbe {
        statuses: Arc<Mutex<HashMap<String, Option<u16>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeProbe {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure the probe status for any URL containing `host`.
        pub fn set_host_status(&self, host: &str, status: Option<u16>) {
            self.statuses.lock().insert(host.to_string(), status);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl HostProbe for FakeProbe {
        async fn head_status(&self, url: &str) -> Option<u16> {
            self.calls.lock().push(url.to_string());
            let statuses = self.statuses.lock();
            for (host, status) in statuses.iter() {
                if url.contains(host) {
                    return *status;
                }
            }
            Some(200)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProbe;

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
