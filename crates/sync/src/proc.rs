// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout-wrapped subprocess execution shared by the git, pip and build
//! runners.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::SyncError;

pub(crate) const GIT_TIMEOUT: Duration = Duration::from_secs(600);
pub(crate) const PIP_TIMEOUT: Duration = Duration::from_secs(1800);

/// Run a command to completion with a hard timeout. A timeout kills the
/// child via the dropped handle's kill-on-drop flag.
pub(crate) async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SyncError> {
    cmd.kill_on_drop(true);
    let fut = cmd.output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(SyncError::Command { label: label.to_string(), message: e.to_string() }),
        Err(_) => Err(SyncError::CommandTimeout { label: label.to_string(), secs: timeout.as_secs() }),
    }
}

/// Like [`run_with_timeout`] but flattens a non-zero exit into an error
/// carrying trimmed stderr.
pub(crate) async fn run_checked(
    cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SyncError> {
    let output = run_with_timeout(cmd, timeout, label).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SyncError::Command {
            label: label.to_string(),
            message: stderr.trim().to_string(),
        });
    }
    Ok(output)
}
