// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC client for the transfer backend's loopback control port.
//!
//! Sends HTTP/1.1 POSTs over TCP. Reads responses using Content-Length
//! framing (does not depend on connection close for EOF).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::client::{QueueCounts, RawStatus, TransferClient, TransferOptions, TransferStatus};
use crate::TransferError;

/// Status keys requested from the backend; keeps responses small when the
/// job table holds thousands of finished entries.
const STATUS_KEYS: &[&str] =
    &["gid", "status", "totalLength", "completedLength", "downloadSpeed", "errorMessage"];

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    code: i64,
    message: String,
}

/// Real backend client speaking JSON-RPC 2.0 to `127.0.0.1:port/jsonrpc`.
#[derive(Clone)]
pub struct RpcTransferClient {
    port: u16,
    secret: Option<String>,
    timeout: Duration,
}

impl RpcTransferClient {
    pub fn new(port: u16, secret: Option<String>) -> Self {
        Self { port, secret, timeout: Duration::from_secs(10) }
    }

    /// Issue one RPC call. The backend's token secret, when configured, is
    /// prepended to the positional params per its convention.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransferError> {
        let mut full_params = Vec::with_capacity(params.len() + 1);
        if let Some(secret) = &self.secret {
            full_params.push(json!(format!("token:{}", secret)));
        }
        full_params.extend(params);

        let body = serde_json::to_string(&json!({
            "jsonrpc": "2.0",
            "id": "rigup",
            "method": method,
            "params": full_params,
        }))?;

        let response = tokio::time::timeout(self.timeout, self.post("/jsonrpc", &body))
            .await
            .map_err(|_| TransferError::Transport("rpc request timed out".into()))??;

        let envelope: RpcEnvelope = serde_json::from_str(&response)?;
        if let Some(fault) = envelope.error {
            return Err(TransferError::Backend { code: fault.code, message: fault.message });
        }
        envelope.result.ok_or_else(|| TransferError::Protocol("response without result".into()))
    }

    async fn post(&self, path: &str, body: &str) -> Result<String, TransferError> {
        let addr = format!("127.0.0.1:{}", self.port);
        let mut stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| TransferError::Transport(format!("connect {} failed: {}", addr, e)))?;

        let request = format!(
            "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            path,
            body.len(),
            body
        );
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| TransferError::Transport(format!("write failed: {}", e)))?;

        let mut reader = BufReader::new(&mut stream);
        read_http_body(&mut reader).await
    }
}

/// Read an HTTP/1.1 response and return its body.
async fn read_http_body<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<String, TransferError> {
    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .await
        .map_err(|e| TransferError::Transport(format!("read status failed: {}", e)))?;

    // Headers: only Content-Length matters (case-insensitive).
    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| TransferError::Transport(format!("read header failed: {}", e)))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    if content_length == 0 {
        return Err(TransferError::Protocol("response without content-length".into()));
    }
    let mut buf = vec![0u8; content_length];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| TransferError::Transport(format!("read body failed: {}", e)))?;
    String::from_utf8(buf).map_err(|e| TransferError::Protocol(format!("non-utf8 body: {}", e)))
}

#[async_trait]
impl TransferClient for RpcTransferClient {
    async fn add_job(&self, url: &str, options: &TransferOptions) -> Result<String, TransferError> {
        let result = self
            .call("aria2.addUri", vec![json!([url]), options.to_backend_options()])
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TransferError::Protocol("addUri returned a non-string gid".into()))
    }

    async fn query_status(&self, gid: &str) -> Result<TransferStatus, TransferError> {
        let result =
            self.call("aria2.tellStatus", vec![json!(gid), json!(STATUS_KEYS)]).await?;
        let raw: RawStatus = serde_json::from_value(result)?;
        raw.into_status()
    }

    async fn counts(&self) -> Result<QueueCounts, TransferError> {
        let result = self.call("aria2.getGlobalStat", vec![]).await?;
        let active = stat_count(&result, "numActive")?;
        let waiting = stat_count(&result, "numWaiting")?;
        Ok(QueueCounts { active, waiting })
    }

    async fn cancel_job(&self, gid: &str) -> Result<(), TransferError> {
        self.call("aria2.forceRemove", vec![json!(gid)]).await?;
        Ok(())
    }

    async fn purge_results(&self) -> Result<(), TransferError> {
        self.call("aria2.purgeDownloadResult", vec![]).await?;
        Ok(())
    }
}

fn stat_count(stat: &Value, key: &str) -> Result<usize, TransferError> {
    stat.get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| TransferError::Protocol(format!("global stat missing {}", key)))
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
