//! Telegram Bot API wire types.
//!
//! Inbound types deserialize the `getUpdates` envelope; outbound types are the
//! payloads the bot sends back. Only the fields the bot actually reads are
//! declared — everything else in the platform's JSON is ignored.

pub mod api;

use crate::storage::ResponseKind;
use serde::{Deserialize, Serialize};

/// One update from `getUpdates`. Carries either a message or a callback
/// query, never both.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    #[serde(default)]
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
    pub sticker: Option<FileRef>,
    pub document: Option<FileRef>,
    pub animation: Option<FileRef>,
    pub audio: Option<FileRef>,
    /// Set when the message was forwarded from a channel.
    pub forward_from_chat: Option<Chat>,
    /// Set when the message arrived in a channel direct-messages topic.
    pub direct_messages_topic: Option<DirectMessagesTopic>,
}

impl Message {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn topic_id(&self) -> Option<i64> {
        self.direct_messages_topic.as_ref().map(|t| t.topic_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_direct_messages: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectMessagesTopic {
    pub topic_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: i64,
}

/// Any media attachment the bot only needs a file reference for.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub user: User,
    #[serde(default)]
    pub status: String,
}

/// Result of `getChat`. `parent_chat` is set for a channel's DM chat and
/// points back at the channel itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub parent_chat: Option<ParentChat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    #[serde(default)]
    pub username: String,
}

/// A chat handle for `getChat` — numeric id or public @username.
#[derive(Debug, Clone)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl std::fmt::Display for ChatRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{id}"),
            ChatRef::Username(name) => f.write_str(name),
        }
    }
}

// --- Outbound ---

/// One inline keyboard button: either a callback button or a URL button.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

pub type Keyboard = Vec<Vec<InlineButton>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_messages_topic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendMessage {
    /// Plain Markdown message with no keyboard.
    pub fn markdown(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: Some("Markdown"),
            direct_messages_topic_id: None,
            reply_markup: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.reply_markup = Some(ReplyMarkup {
            inline_keyboard: keyboard,
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyMarkup {
    pub inline_keyboard: Keyboard,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditMessageText {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl EditMessageText {
    pub fn markdown(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            text: text.into(),
            parse_mode: Some("Markdown"),
            reply_markup: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.reply_markup = Some(ReplyMarkup {
            inline_keyboard: keyboard,
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallback {
    pub callback_query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_alert: bool,
}

impl AnswerCallback {
    /// Plain acknowledgement — dismisses the client's loading spinner.
    pub fn ack(callback_query_id: impl Into<String>) -> Self {
        Self {
            callback_query_id: callback_query_id.into(),
            text: None,
            show_alert: false,
        }
    }

    /// Pop-up alert shown to the user.
    pub fn alert(callback_query_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            callback_query_id: callback_query_id.into(),
            text: Some(text.into()),
            show_alert: true,
        }
    }
}

/// A non-text reply: photo, sticker, document, animation, or audio.
#[derive(Debug, Clone)]
pub struct SendMedia {
    pub chat_id: i64,
    pub kind: ResponseKind,
    pub file_id: String,
    pub caption: Option<String>,
    pub direct_messages_topic_id: Option<i64>,
}
