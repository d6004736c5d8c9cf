//! Bot API client using raw reqwest (no framework).
//!
//! Long-polls via `getUpdates`; everything else is a plain POST with a JSON
//! payload. The bot core talks to the [`ChatApi`] trait so tests can substitute
//! a fake.

use super::{
    AnswerCallback, BotInfo, ChatInfo, ChatMember, ChatRef, EditMessageText, SendMedia,
    SendMessage, Update,
};
use crate::storage::ResponseKind;
use async_trait::async_trait;
use color_eyre::eyre::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Standard Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Everything the bot core calls on the chat platform.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Long-poll for updates at the given offset.
    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>>;

    async fn send_message(&self, msg: &SendMessage) -> Result<()>;

    async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()>;

    async fn answer_callback(&self, answer: &AnswerCallback) -> Result<()>;

    async fn send_media(&self, media: &SendMedia) -> Result<()>;

    async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>>;

    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo>;

    async fn get_me(&self) -> Result<BotInfo>;
}

/// Live Bot API client.
pub struct TelegramApi {
    token: String,
    client: reqwest::Client,
    poll_timeout_secs: u64,
}

impl TelegramApi {
    pub fn new(token: String, poll_timeout_secs: u64) -> Result<Self> {
        // Client timeout sits above the long-poll timeout so getUpdates can
        // block the full window.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(poll_timeout_secs + 30))
            .build()?;
        Ok(Self {
            token,
            client,
            poll_timeout_secs,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    /// POST a JSON payload and unwrap the response envelope.
    async fn call<T: DeserializeOwned, P: serde::Serialize + ?Sized>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<T> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(payload)
            .send()
            .await?;

        let body: ApiResponse<T> = resp.json().await?;
        if !body.ok {
            let desc = body.description.unwrap_or_default();
            color_eyre::eyre::bail!("API error on {method}: {desc}");
        }
        body.result
            .ok_or_else(|| color_eyre::eyre::eyre!("API returned ok without a result on {method}"))
    }
}

#[async_trait]
impl ChatApi for TelegramApi {
    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let resp = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
            ])
            .send()
            .await?;

        let body: ApiResponse<Vec<Update>> = resp.json().await?;
        if !body.ok {
            let desc = body.description.unwrap_or_default();
            color_eyre::eyre::bail!("API error on getUpdates: {desc}");
        }
        Ok(body.result.unwrap_or_default())
    }

    async fn send_message(&self, msg: &SendMessage) -> Result<()> {
        let result = self
            .call::<serde_json::Value, _>("sendMessage", msg)
            .await;

        // Markdown in user-supplied text can fail to parse server-side;
        // retry the same message as plain text.
        if result.is_err() && msg.parse_mode.is_some() {
            let mut plain = msg.clone();
            plain.parse_mode = None;
            self.call::<serde_json::Value, _>("sendMessage", &plain)
                .await?;
            return Ok(());
        }
        result.map(|_| ())
    }

    async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()> {
        self.call::<serde_json::Value, _>("editMessageText", edit)
            .await
            .map(|_| ())
    }

    async fn answer_callback(&self, answer: &AnswerCallback) -> Result<()> {
        self.call::<serde_json::Value, _>("answerCallbackQuery", answer)
            .await
            .map(|_| ())
    }

    async fn send_media(&self, media: &SendMedia) -> Result<()> {
        let (method, file_field) = match media.kind {
            ResponseKind::Photo => ("sendPhoto", "photo"),
            ResponseKind::Sticker => ("sendSticker", "sticker"),
            ResponseKind::Document => ("sendDocument", "document"),
            ResponseKind::Animation => ("sendAnimation", "animation"),
            ResponseKind::Audio => ("sendAudio", "audio"),
            ResponseKind::Text => {
                color_eyre::eyre::bail!("text responses go through sendMessage")
            }
        };

        let mut payload = serde_json::json!({
            "chat_id": media.chat_id,
            file_field: media.file_id,
        });
        if let Some(caption) = &media.caption {
            if !caption.is_empty() {
                payload["caption"] = serde_json::json!(caption);
            }
        }
        if let Some(topic_id) = media.direct_messages_topic_id {
            payload["direct_messages_topic_id"] = serde_json::json!(topic_id);
        }

        self.call::<serde_json::Value, _>(method, &payload)
            .await
            .map(|_| ())
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>> {
        self.call("getChatAdministrators", &serde_json::json!({ "chat_id": chat_id }))
            .await
    }

    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo> {
        let payload = match chat {
            ChatRef::Id(id) => serde_json::json!({ "chat_id": id }),
            ChatRef::Username(name) => serde_json::json!({ "chat_id": name }),
        };
        self.call("getChat", &payload).await
    }

    async fn get_me(&self) -> Result<BotInfo> {
        self.call("getMe", &serde_json::json!({})).await
    }
}
