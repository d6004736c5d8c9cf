//! Interactive wizard steps: channel registration by forwarded message and
//! the learn flow that captures a trigger phrase and its response.

use super::callback;
use super::session::{Step, UserSession};
use super::Bot;
use crate::storage::{ResponseKind, TriggerRecord};
use crate::telegram::{InlineButton, Keyboard, Message, SendMessage, User};
use color_eyre::eyre::Result;

impl Bot {
    /// Route a plain message to the step the user's session is waiting on.
    /// Invalid input re-prompts and leaves the session untouched; `/cancel`
    /// is the only way out.
    pub(crate) async fn handle_session_message(
        &self,
        msg: &Message,
        user: &User,
        session: UserSession,
        lang: &str,
    ) -> Result<()> {
        match session.step {
            Step::AwaitingRegistrationForward => {
                self.handle_registration_forward(msg, user, lang).await
            }
            Step::AwaitingTrigger => self.handle_trigger_phrase(msg, user, session, lang).await,
            Step::AwaitingResponseType => {
                // Typed text instead of pressing a kind button.
                let prompt = SendMessage::markdown(
                    msg.chat.id,
                    self.render(lang, "learn_prompt_type", &[("trigger", &session.trigger_text)]),
                )
                .with_keyboard(response_type_keyboard(self, lang));
                self.api.send_message(&prompt).await
            }
            Step::AwaitingText => self.handle_response_text(msg, user, session, lang).await,
            Step::AwaitingPhoto
            | Step::AwaitingSticker
            | Step::AwaitingDocument
            | Step::AwaitingAnimation
            | Step::AwaitingAudio => self.handle_response_media(msg, user, session, lang).await,
        }
    }

    /// `/register` wizard: the user must forward any message from the target
    /// channel. The forward header carries the channel's id and title.
    async fn handle_registration_forward(
        &self,
        msg: &Message,
        user: &User,
        lang: &str,
    ) -> Result<()> {
        let Some(channel) = msg.forward_from_chat.as_ref() else {
            let reply = SendMessage::markdown(
                msg.chat.id,
                self.render(lang, "register_invalid_forward", &[]),
            );
            return self.api.send_message(&reply).await;
        };
        let title = channel.title.clone().unwrap_or_else(|| channel.id.to_string());

        let registered = self
            .register_verified_channel(msg.chat.id, user.id, channel.id, &title, lang)
            .await?;
        if registered {
            self.sessions.clear(user.id);
        }
        Ok(())
    }

    async fn handle_trigger_phrase(
        &self,
        msg: &Message,
        user: &User,
        mut session: UserSession,
        lang: &str,
    ) -> Result<()> {
        let trigger = msg.text().trim();
        if trigger.is_empty() {
            let reply =
                SendMessage::markdown(msg.chat.id, self.render(lang, "learn_prompt_trigger", &[]));
            return self.api.send_message(&reply).await;
        }

        session.trigger_text = trigger.to_owned();
        session.step = Step::AwaitingResponseType;
        self.sessions.set(user.id, session);

        let prompt = SendMessage::markdown(
            msg.chat.id,
            self.render(lang, "learn_prompt_type", &[("trigger", trigger)]),
        )
        .with_keyboard(response_type_keyboard(self, lang));
        self.api.send_message(&prompt).await
    }

    async fn handle_response_text(
        &self,
        msg: &Message,
        user: &User,
        session: UserSession,
        lang: &str,
    ) -> Result<()> {
        let text = msg.text().trim();
        if text.is_empty() {
            return self.wrong_response_kind(msg.chat.id, ResponseKind::Text, lang).await;
        }

        self.finalize_trigger(msg, user, session, text.to_owned(), None, lang)
            .await
    }

    /// Media steps share one shape: the message must carry the kind the user
    /// picked; anything else re-prompts without touching the session.
    async fn handle_response_media(
        &self,
        msg: &Message,
        user: &User,
        session: UserSession,
        lang: &str,
    ) -> Result<()> {
        let Some(kind) = session.response_type else {
            // Step and response_type are always set together; a session
            // without a kind is unrecoverable.
            self.sessions.clear(user.id);
            let reply = SendMessage::markdown(msg.chat.id, self.render(lang, "internal_error", &[]));
            return self.api.send_message(&reply).await;
        };

        let file_id = match kind {
            ResponseKind::Photo => largest_photo(msg),
            ResponseKind::Sticker => msg.sticker.as_ref().map(|s| s.file_id.clone()),
            ResponseKind::Document => msg.document.as_ref().map(|d| d.file_id.clone()),
            ResponseKind::Animation => msg.animation.as_ref().map(|a| a.file_id.clone()),
            ResponseKind::Audio => msg.audio.as_ref().map(|a| a.file_id.clone()),
            ResponseKind::Text => None,
        };
        let Some(file_id) = file_id else {
            return self.wrong_response_kind(msg.chat.id, kind, lang).await;
        };

        // Stickers can't carry captions; for everything else the caption
        // becomes the response text.
        let caption = if kind == ResponseKind::Sticker {
            String::new()
        } else {
            msg.caption.clone().unwrap_or_default()
        };

        self.finalize_trigger(msg, user, session, caption, Some(file_id), lang)
            .await
    }

    async fn wrong_response_kind(
        &self,
        chat_id: i64,
        expected: ResponseKind,
        lang: &str,
    ) -> Result<()> {
        let reply = SendMessage::markdown(
            chat_id,
            self.render(lang, "learn_wrong_file_type", &[("expected_type", expected.as_str())]),
        );
        self.api.send_message(&reply).await
    }

    /// Persist the completed trigger, end the session, confirm.
    async fn finalize_trigger(
        &self,
        msg: &Message,
        user: &User,
        session: UserSession,
        response_text: String,
        response_file_id: Option<String>,
        lang: &str,
    ) -> Result<()> {
        let Some(response_type) = session.response_type else {
            self.sessions.clear(user.id);
            let reply = SendMessage::markdown(msg.chat.id, self.render(lang, "internal_error", &[]));
            return self.api.send_message(&reply).await;
        };

        let record = TriggerRecord {
            id: 0,
            channel_id: session.channel_id,
            trigger_text: session.trigger_text.clone(),
            response_type,
            response_text,
            response_file_id,
        };
        if let Err(e) = self.store.upsert_trigger(record) {
            eprintln!(
                "[bot] Failed to store trigger {:?} for channel {}: {e}",
                session.trigger_text, session.channel_id
            );
            let reply = SendMessage::markdown(msg.chat.id, self.render(lang, "internal_error", &[]));
            self.api.send_message(&reply).await?;
            return Err(e);
        }

        self.sessions.clear(user.id);
        eprintln!(
            "[bot] Learned trigger {:?} for channel {} (user {})",
            session.trigger_text, session.channel_id, user.id
        );

        let reply = SendMessage::markdown(
            msg.chat.id,
            self.render(lang, "learn_success", &[("trigger", &session.trigger_text)]),
        );
        self.api.send_message(&reply).await
    }
}

/// The response-kind picker shown after the trigger phrase is captured.
pub(crate) fn response_type_keyboard(bot: &Bot, lang: &str) -> Keyboard {
    let button = |key: &str, kind: ResponseKind| {
        InlineButton::callback(bot.render(lang, key, &[]), callback::learn_type(kind))
    };
    vec![
        vec![
            button("reply_type_text", ResponseKind::Text),
            button("reply_type_photo", ResponseKind::Photo),
            button("reply_type_sticker", ResponseKind::Sticker),
        ],
        vec![
            button("reply_type_document", ResponseKind::Document),
            button("reply_type_gif", ResponseKind::Animation),
        ],
        vec![button("reply_type_audio", ResponseKind::Audio)],
    ]
}

/// Single button linking to the placeholder cheat-sheet, shown while waiting
/// for a text response.
pub(crate) fn placeholder_help_keyboard(bot: &Bot, lang: &str) -> Keyboard {
    vec![vec![InlineButton::callback(
        bot.render(lang, "placeholder_button", &[]),
        "show_placeholder_help",
    )]]
}

/// Telegram sends photos as a size ladder; keep the largest rendition.
fn largest_photo(msg: &Message) -> Option<String> {
    msg.photo
        .as_ref()?
        .iter()
        .max_by_key(|size| size.file_size)
        .map(|size| size.file_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::PhotoSize;

    #[test]
    fn test_largest_photo_picks_biggest_rendition() {
        let msg = Message {
            photo: Some(vec![
                PhotoSize {
                    file_id: "small".into(),
                    file_size: 100,
                },
                PhotoSize {
                    file_id: "big".into(),
                    file_size: 9000,
                },
                PhotoSize {
                    file_id: "medium".into(),
                    file_size: 2000,
                },
            ]),
            ..Message::default()
        };
        assert_eq!(largest_photo(&msg), Some("big".into()));
    }

    #[test]
    fn test_largest_photo_none_without_photo() {
        assert_eq!(largest_photo(&Message::default()), None);
    }
}
