// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod fetch;
pub mod launch;
pub mod provision;
pub mod sync;

use async_trait::async_trait;
use rigup_core::ProvisionConfig;
use rigup_supervise::{
    NoopNotifyAdapter, NotifyAdapter, NotifyError, TelegramNotifyAdapter,
};

/// Runtime-selected notification sink.
#[derive(Clone)]
pub enum Notifier {
    Telegram(TelegramNotifyAdapter),
    Noop(NoopNotifyAdapter),
}

impl Notifier {
    pub fn from_config(config: &ProvisionConfig) -> Self {
        match &config.telegram {
            Some(tg) => {
                Notifier::Telegram(TelegramNotifyAdapter::new(&tg.bot_token, &tg.chat_id))
            }
            None => Notifier::Noop(NoopNotifyAdapter),
        }
    }
}

#[async_trait]
impl NotifyAdapter for Notifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        match self {
            Notifier::Telegram(adapter) => adapter.notify(title, message).await,
            Notifier::Noop(adapter) => adapter.notify(title, message).await,
        }
    }
}
