// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {name}: {message}")]
    Spawn { name: String, message: String },

    #[error("{name} exited immediately with no pid")]
    NoPid { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
