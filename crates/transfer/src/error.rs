// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from the transfer backend and download orchestration
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("backend rpc transport failed: {0}")]
    Transport(String),

    #[error("backend rejected request: {code}: {message}")]
    Backend { code: i64, message: String },

    #[error("malformed backend response: {0}")]
    Protocol(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("destination has no parent directory: {0}")]
    InvalidDestination(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
