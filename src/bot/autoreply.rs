//! Auto-reply matching for channel direct-message topics.
//!
//! Subscribers write to a channel's DM chat; triggers are keyed on the
//! channel itself. `getChat` on the DM chat exposes `parent_chat`, which is
//! the channel the triggers were learned for.

use super::Bot;
use crate::storage::ResponseKind;
use crate::telegram::{ChatRef, Message, SendMedia, SendMessage, User};
use color_eyre::eyre::Result;

impl Bot {
    /// Match an incoming DM-topic message against the owning channel's
    /// triggers and reply in the same topic. No match is a no-op; a failed
    /// chat lookup is logged and swallowed so one bad chat can't error the
    /// whole update.
    pub(crate) async fn handle_auto_reply(&self, msg: &Message, user: &User) -> Result<()> {
        let info = match self.api.get_chat(&ChatRef::Id(msg.chat.id)).await {
            Ok(info) => info,
            Err(e) => {
                eprintln!(
                    "[bot] Auto-reply: failed to resolve chat {}: {e}",
                    msg.chat.id
                );
                return Ok(());
            }
        };
        let channel_id = info.parent_chat.map(|p| p.id).unwrap_or(msg.chat.id);

        let Some(record) = self.store.get_trigger(channel_id, msg.text())? else {
            return Ok(());
        };
        eprintln!(
            "[bot] Auto-reply: trigger {:?} matched in channel {channel_id}",
            record.trigger_text
        );

        let topic_id = msg.topic_id();
        match record.response_type {
            ResponseKind::Text => {
                let text = record
                    .response_text
                    .replace("{{user_first_name}}", &user.first_name);
                let reply = SendMessage {
                    chat_id: msg.chat.id,
                    text,
                    parse_mode: Some("Markdown"),
                    direct_messages_topic_id: topic_id,
                    reply_markup: None,
                };
                self.api.send_message(&reply).await
            }
            kind => {
                let Some(file_id) = record.response_file_id else {
                    eprintln!(
                        "[bot] Auto-reply: trigger {} has kind {kind} but no file id",
                        record.id
                    );
                    return Ok(());
                };
                let media = SendMedia {
                    chat_id: msg.chat.id,
                    kind,
                    file_id,
                    caption: (!record.response_text.is_empty())
                        .then(|| record.response_text.clone()),
                    direct_messages_topic_id: topic_id,
                };
                self.api.send_media(&media).await
            }
        }
    }
}
