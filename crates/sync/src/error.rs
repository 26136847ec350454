// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{label} failed: {message}")]
    Command { label: String, message: String },

    #[error("{label} timed out after {secs}s")]
    CommandTimeout { label: String, secs: u64 },

    #[error("blob store: {0}")]
    Store(String),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no staging directory available for {0}")]
    NoStaging(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
