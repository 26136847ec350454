// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rigup-transfer: model-weight download orchestration.
//!
//! The actual byte moving is done by a separate long-lived transfer backend
//! reached over a loopback JSON-RPC control protocol; this crate enqueues,
//! polls, renders progress, and cleans up. It never streams file contents
//! itself.

mod client;
mod error;
mod fetch;
mod progress;
mod queue;
mod rpc;

pub use client::{JobHandle, QueueCounts, TransferClient, TransferOptions, TransferStatus};
pub use error::TransferError;
pub use fetch::{FetchOutcome, Fetcher, HostProbe, ReqwestProbe};
pub use progress::{human_bytes, ItemProgress, RecentLedger, Snapshot};
pub use queue::{DownloadQueue, QueueReport};
pub use rpc::RpcTransferClient;

#[cfg(any(test, feature = "test-support"))]
pub use client::FakeTransferClient;
#[cfg(any(test, feature = "test-support"))]
pub use fetch::FakeProbe;
