// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for sending operator notifications
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Send a notification with a title and message body
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Telegram bot notification adapter.
///
/// Delivery is single-shot best-effort: a failed send is logged and
/// swallowed, since losing an alert must never take down the supervisor
/// emitting it.
#[derive(Clone)]
pub struct TelegramNotifyAdapter {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifyAdapter {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { bot_token: bot_token.into(), chat_id: chat_id.into(), client }
    }
}

#[async_trait]
impl NotifyAdapter for TelegramNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let text = format!("[{stamp}] {title}\n{message}");
        let result = self
            .client
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", &text)])
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(%title, "telegram notification sent");
            }
            Ok(response) => {
                tracing::warn!(%title, status = %response.status(), "telegram rejected notification");
            }
            Err(e) => {
                tracing::warn!(%title, error = %e, "telegram notification failed");
            }
        }
        Ok(())
    }
}

/// Notification adapter used when no bot is configured — logs and drops.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifyAdapter;

#[async_trait]
impl NotifyAdapter for NoopNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(%title, %message, "notification (no sink configured)");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{NotifyAdapter, NotifyError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded notification
    #[derive(Debug, Clone)]
    pub struct NotifyCall {
        pub title: String,
        pub message: String,
    }

    /// Fake notification adapter for testing
    #[derive(Clone, Default)]
    pub struct FakeNotifyAdapter {
        calls: Arc<Mutex<Vec<NotifyCall>>>,
    }

    impl FakeNotifyAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded notifications
        pub fn calls(&self) -> Vec<NotifyCall> {
            self.calls.lock().clone()
        }

        /// Titles only, for terser assertions.
        pub fn titles(&self) -> Vec<String> {
            self.calls.lock().iter().map(|c| c.title.clone()).collect()
        }
    }

    #[async_trait]
    impl NotifyAdapter for FakeNotifyAdapter {
        async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
            self.calls
                .lock()
                .push(NotifyCall { title: title.to_string(), message: message.to_string() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};
