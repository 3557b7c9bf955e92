//! Uploader feedback via the origin channel
//!
//! One "processing" message per upload event, edited in place exactly once
//! with the final outcome. There is no other delivery channel for pipeline
//! results.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::telegram::TelegramClient;

/// Reference to the single outbound status message for one upload event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Progress reporting contract the ingest pipeline runs against
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    /// Announce that processing has begun, tagged with the source filename
    async fn processing(&self, chat_id: i64, filename: &str) -> Result<StatusMessage>;

    /// Replace the status message with a success summary and record link
    async fn succeeded(&self, status: &StatusMessage, title: &str, record_url: &str) -> Result<()>;

    /// Replace the status message with a human-readable failure reason
    async fn failed(&self, status: &StatusMessage, reason: &str) -> Result<()>;
}

/// Telegram-backed notifier
pub struct TelegramNotifier {
    telegram: Arc<TelegramClient>,
}

impl TelegramNotifier {
    pub fn new(telegram: Arc<TelegramClient>) -> Self {
        Self { telegram }
    }
}

#[async_trait]
impl StatusNotifier for TelegramNotifier {
    async fn processing(&self, chat_id: i64, filename: &str) -> Result<StatusMessage> {
        let sent = self
            .telegram
            .send_message(chat_id, &format!("⚙️ Processing `{filename}`..."))
            .await?;

        Ok(StatusMessage {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn succeeded(&self, status: &StatusMessage, title: &str, record_url: &str) -> Result<()> {
        let text = format!(
            "✅ **Added!**\n🎬 **Title:** {title}\n🌐 **View:** [Click Here]({record_url})"
        );
        self.telegram
            .edit_message_text(status.chat_id, status.message_id, &text)
            .await
    }

    async fn failed(&self, status: &StatusMessage, reason: &str) -> Result<()> {
        self.telegram
            .edit_message_text(status.chat_id, status.message_id, &format!("❌ {reason}"))
            .await
    }
}
