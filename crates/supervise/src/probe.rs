// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker endpoint health probe.
//!
//! Any HTTP response at all counts as up — workers under load answer
//! slowly or with errors long before they stop answering entirely, and
//! only the latter is a health signal here.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait HealthProbe: Clone + Send + Sync + 'static {
    async fn is_up(&self, port: u16) -> bool;
}

/// Probe over a plain loopback HTTP request.
#[derive(Clone, Copy, Default)]
pub struct HttpHealthProbe;

impl HttpHealthProbe {
    pub fn new() -> Self {
        Self
    }

    async fn request(port: u16) -> std::io::Result<bool> {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;
        let request =
            format!("GET / HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut head = [0u8; 12];
        let n = stream.read(&mut head).await?;
        Ok(head[..n].starts_with(b"HTTP/"))
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_up(&self, port: u16) -> bool {
        match tokio::time::timeout(PROBE_TIMEOUT, Self::request(port)).await {
            Ok(Ok(answered)) => answered,
            Ok(Err(_)) | Err(_) => false,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::HealthProbe;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted probe: per-port queue of responses, then a steady state.
    #[derive(Clone, Default)]
    pub struct FakeHealthProbe {
        scripted: Arc<Mutex<HashMap<u16, VecDeque<bool>>>>,
        steady: Arc<Mutex<HashMap<u16, bool>>>,
    }

    impl FakeHealthProbe {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue one-off responses for a port, consumed in order.
        pub fn script(&self, port: u16, responses: &[bool]) {
            self.scripted.lock().entry(port).or_default().extend(responses.iter().copied());
        }

        /// Response once the script is exhausted. Unset ports answer down.
        pub fn set_steady(&self, port: u16, up: bool) {
            self.steady.lock().insert(port, up);
        }
    }

    #[async_trait]
    impl HealthProbe for FakeHealthProbe {
        async fn is_up(&self, port: u16) -> bool {
            if let Some(queue) = self.scripted.lock().get_mut(&port) {
                if let Some(up) = queue.pop_front() {
                    return up;
                }
            }
            self.steady.lock().get(&port).copied().unwrap_or(false)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHealthProbe;

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
