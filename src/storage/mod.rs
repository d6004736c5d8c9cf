//! Persistent store for learned triggers, user languages, and registered
//! channels.
//!
//! The bot core only talks to the [`Storage`] trait; the JSON-file backend in
//! [`json`] is the default implementation. Integration tests swap in their own.

pub mod json;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};

/// The media kind of a stored response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Text,
    Photo,
    Sticker,
    Document,
    Animation,
    Audio,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Text => "text",
            ResponseKind::Photo => "photo",
            ResponseKind::Sticker => "sticker",
            ResponseKind::Document => "document",
            ResponseKind::Animation => "animation",
            ResponseKind::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ResponseKind::Text),
            "photo" => Some(ResponseKind::Photo),
            "sticker" => Some(ResponseKind::Sticker),
            "document" => Some(ResponseKind::Document),
            "animation" => Some(ResponseKind::Animation),
            "audio" => Some(ResponseKind::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learned trigger → response pair, scoped to one channel.
///
/// `trigger_text` is stored lowercased; matching is exact and case-insensitive.
/// At most one record exists per `(channel_id, trigger_text)` — later writes
/// replace earlier ones but keep the original `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub id: i64,
    pub channel_id: i64,
    pub trigger_text: String,
    pub response_type: ResponseKind,
    /// Text body, or the caption for media responses.
    #[serde(default)]
    pub response_text: String,
    /// Platform file reference for media responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_file_id: Option<String>,
}

/// A channel someone has registered with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredChannel {
    pub channel_id: i64,
    pub title: String,
    pub registered_by_user_id: i64,
    pub registered_at: DateTime<Utc>,
}

/// Storage operations the bot core needs. All methods are synchronous and
/// callable from concurrent handler tasks; implementations synchronize
/// internally.
pub trait Storage: Send + Sync {
    /// Insert or replace the trigger for `(record.channel_id, record.trigger_text)`.
    /// The incoming `id` is ignored; returns the id under which the record was
    /// stored (existing id on replace, fresh id on insert).
    fn upsert_trigger(&self, record: TriggerRecord) -> Result<i64>;

    /// Exact lookup by channel and trigger text. `trigger` is case-folded
    /// before comparison.
    fn get_trigger(&self, channel_id: i64, trigger: &str) -> Result<Option<TriggerRecord>>;

    fn get_trigger_by_id(&self, id: i64) -> Result<Option<TriggerRecord>>;

    fn list_triggers(&self, channel_id: i64) -> Result<Vec<TriggerRecord>>;

    /// Delete by id. Deleting a missing id is not an error.
    fn delete_trigger(&self, id: i64) -> Result<()>;

    fn get_user_language(&self, user_id: i64) -> Result<Option<String>>;

    fn set_user_language(&self, user_id: i64, lang: &str) -> Result<()>;

    /// Register (or re-register) a channel. Keyed on `channel_id`.
    fn register_channel(&self, channel_id: i64, title: &str, user_id: i64) -> Result<()>;

    fn registered_channels(&self) -> Result<Vec<RegisteredChannel>>;
}
