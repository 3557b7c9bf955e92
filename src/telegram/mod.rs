//! Telegram Bot API client
//!
//! Covers the four methods the service needs: sendMessage, editMessageText,
//! getFile and setWebhook, plus the update envelope delivered to the webhook.
//! Base URL: https://api.telegram.org

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::ingest::{MediaKind, UploadEvent};

/// Generic Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// A message the bot has sent (only the fields we edit by later)
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
    pub chat: Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// getFile result: the transient path for direct byte access
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_size: Option<i64>,
    pub file_path: Option<String>,
}

/// Incoming webhook update. Only channel posts matter here; every other
/// update shape deserializes with `channel_post: None` and is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub channel_post: Option<ChannelPost>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelPost {
    pub message_id: i64,
    pub chat: PostChat,
    #[serde(default)]
    pub video: Option<Attachment>,
    #[serde(default)]
    pub document: Option<Attachment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Attachment {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl Update {
    /// Decode this update into zero or one upload events.
    ///
    /// Returns None unless the update is a channel post carrying a named
    /// video or document attachment. The channel allow-list is enforced by
    /// the pipeline, not here.
    pub fn upload_event(&self) -> Option<UploadEvent> {
        let post = self.channel_post.as_ref()?;

        let (attachment, kind) = match (&post.video, &post.document) {
            (Some(video), _) => (video, MediaKind::Video),
            (None, Some(document)) => (document, MediaKind::Document),
            (None, None) => return None,
        };

        let file_name = attachment.file_name.clone().filter(|n| !n.is_empty())?;

        Some(UploadEvent {
            chat_id: post.chat.id,
            message_id: post.message_id,
            file_id: attachment.file_id.clone(),
            file_name,
            file_size: attachment.file_size.unwrap_or(0),
            kind,
        })
    }
}

/// Telegram Bot API client
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token,
        }
    }

    /// Client pointed at a stand-in Bot API server
    #[cfg(test)]
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Direct download URL for a path returned by getFile
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram {method}"))?;

        let body: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram {method} response"))?;

        if !body.ok {
            anyhow::bail!(
                "Telegram {method} failed: {}",
                body.description.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        body.result
            .with_context(|| format!("Telegram {method} returned ok without a result"))
    }

    /// Send a Markdown message to a chat
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage> {
        debug!(chat_id = chat_id, "Sending Telegram message");

        self.call(
            "sendMessage",
            serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }),
        )
        .await
    }

    /// Edit a previously sent message in place
    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        debug!(chat_id = chat_id, message_id = message_id, "Editing Telegram message");

        // editMessageText returns the edited Message; we only need success.
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                serde_json::json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                    "parse_mode": "Markdown",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;

        Ok(())
    }

    /// Resolve a file identifier to its transient download path
    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile> {
        debug!(file_id = file_id, "Resolving Telegram file");

        self.call("getFile", serde_json::json!({ "file_id": file_id }))
            .await
    }

    /// Point Telegram's webhook delivery at the given URL
    pub async fn set_webhook(&self, url: &str) -> Result<bool> {
        debug!(url = url, "Registering Telegram webhook");

        self.call("setWebhook", serde_json::json!({ "url": url }))
            .await
    }

    /// Open a streaming fetch of a file's bytes
    pub async fn fetch_file(&self, file_path: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .context("Failed to fetch file bytes from Telegram")?;

        if !response.status().is_success() {
            anyhow::bail!("Telegram file fetch failed with status: {}", response.status());
        }

        Ok(response)
    }
}
