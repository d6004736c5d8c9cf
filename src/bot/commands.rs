//! Slash-command decoding and handlers.

use super::session::UserSession;
use super::{callback, Bot};
use crate::storage::RegisteredChannel;
use crate::telegram::{ChatRef, InlineButton, Message, SendMessage, User};
use color_eyre::eyre::Result;

/// A recognized slash command. Decoded once at the routing boundary; commands
/// other than `Learn` take precedence over any active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Register,
    Manage,
    Lang,
    Cancel,
    Learn,
}

impl Command {
    /// Parse `/command[@botname] [args…]`. An `@` suffix addressed to a
    /// different bot is left alone (group chats share the command namespace).
    pub fn parse<'a>(text: &'a str, bot_username: &str) -> Option<(Command, &'a str)> {
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };

        let name = match head.split_once('@') {
            Some((name, addressee)) => {
                if !addressee.eq_ignore_ascii_case(bot_username) {
                    return None;
                }
                name
            }
            None => head,
        };

        let command = match name {
            "start" => Command::Start,
            "help" => Command::Help,
            "register" => Command::Register,
            "manage" => Command::Manage,
            "lang" => Command::Lang,
            "cancel" => Command::Cancel,
            "learn" => Command::Learn,
            _ => return None,
        };
        Some((command, args))
    }
}

impl Bot {
    pub(crate) async fn handle_command(
        &self,
        command: Command,
        args: &str,
        msg: &Message,
        user: &User,
        lang: &str,
    ) -> Result<()> {
        eprintln!("[bot] Command /{command:?} from user {}", user.id);
        match command {
            Command::Start => self.handle_start(msg.chat.id, lang).await,
            Command::Help => self.handle_help(msg.chat.id, lang).await,
            Command::Register => self.handle_register(args, msg, user, lang).await,
            Command::Manage => self.handle_manage(msg, user, lang).await,
            Command::Lang => self.send_language_prompt(msg.chat.id, lang).await,
            Command::Cancel => self.handle_cancel(msg, user, lang).await,
            // Learn is routed after the session check; unreachable here.
            Command::Learn => self.handle_learn(msg, user, lang).await,
        }
    }

    async fn handle_start(&self, chat_id: i64, lang: &str) -> Result<()> {
        let add_url = format!(
            "https://t.me/{}?startgroup=start&admin=post_messages",
            self.username
        );
        let keyboard = vec![
            vec![
                InlineButton::callback(self.render(lang, "help_button", &[]), "help_main"),
                InlineButton::callback(self.render(lang, "language_button", &[]), "lang_prompt"),
            ],
            vec![InlineButton::link(
                self.render(lang, "add_to_channel_button", &[]),
                add_url,
            )],
        ];
        let msg = SendMessage::markdown(chat_id, self.render(lang, "start_message", &[]))
            .with_keyboard(keyboard);
        self.api.send_message(&msg).await
    }

    async fn handle_help(&self, chat_id: i64, lang: &str) -> Result<()> {
        let msg = SendMessage::markdown(chat_id, self.render(lang, "help_main_text", &[]))
            .with_keyboard(self.help_menu_keyboard(lang));
        self.api.send_message(&msg).await
    }

    /// `/register` with no args starts the forward-a-message wizard;
    /// `/register <id|@username>` verifies and registers directly.
    async fn handle_register(
        &self,
        args: &str,
        msg: &Message,
        user: &User,
        lang: &str,
    ) -> Result<()> {
        if args.is_empty() {
            self.sessions.set(user.id, UserSession::registration());
            let prompt =
                SendMessage::markdown(msg.chat.id, self.render(lang, "register_prompt_forward", &[]));
            return self.api.send_message(&prompt).await;
        }

        let chat_ref = if let Ok(id) = args.parse::<i64>() {
            ChatRef::Id(id)
        } else if args.starts_with('@') && args.len() > 1 && !args.contains(char::is_whitespace) {
            ChatRef::Username(args.to_owned())
        } else {
            let usage = SendMessage::markdown(msg.chat.id, self.render(lang, "register_usage", &[]));
            return self.api.send_message(&usage).await;
        };

        let info = match self.api.get_chat(&chat_ref).await {
            Ok(info) => info,
            Err(e) => {
                eprintln!("[bot] Register failed for {chat_ref}: could not get chat info: {e}");
                let reply = SendMessage::markdown(
                    msg.chat.id,
                    self.render(lang, "register_fail_not_found", &[]),
                );
                return self.api.send_message(&reply).await;
            }
        };
        let title = info.title.clone().unwrap_or_else(|| info.id.to_string());

        self.register_verified_channel(msg.chat.id, user.id, info.id, &title, lang)
            .await?;
        Ok(())
    }

    /// Shared tail of both registration paths: live admin check, persist,
    /// invalidate the admin cache, confirm.
    pub(crate) async fn register_verified_channel(
        &self,
        reply_chat_id: i64,
        user_id: i64,
        channel_id: i64,
        title: &str,
        lang: &str,
    ) -> Result<bool> {
        match self.is_user_admin(channel_id, user_id).await {
            Ok(true) => {}
            Ok(false) => {
                eprintln!("[bot] Register failed for channel {channel_id}: user {user_id} is not admin");
                let reply = SendMessage::markdown(
                    reply_chat_id,
                    self.render(lang, "register_fail_not_admin", &[]),
                );
                self.api.send_message(&reply).await?;
                return Ok(false);
            }
            Err(e) => {
                eprintln!("[bot] Admin check failed for channel {channel_id} user {user_id}: {e}");
                let reply = SendMessage::markdown(
                    reply_chat_id,
                    self.render(lang, "register_admin_check_failed", &[("channel_title", title)]),
                );
                self.api.send_message(&reply).await?;
                return Ok(false);
            }
        }

        if let Err(e) = self.store.register_channel(channel_id, title, user_id) {
            eprintln!("[bot] Register failed for channel {channel_id}: storage error: {e}");
            let reply =
                SendMessage::markdown(reply_chat_id, self.render(lang, "internal_error", &[]));
            self.api.send_message(&reply).await?;
            return Err(e);
        }

        // The user's admin set just changed; a stale cache would hide the new
        // channel from /learn and /manage until the TTL ran out.
        self.admin_cache.invalidate(user_id);

        let reply = SendMessage::markdown(
            reply_chat_id,
            self.render(lang, "register_success", &[("channel_title", title)]),
        );
        self.api.send_message(&reply).await?;
        Ok(true)
    }

    async fn handle_manage(&self, msg: &Message, user: &User, lang: &str) -> Result<()> {
        let channels = self.admin_channels(user.id).await?;
        if channels.is_empty() {
            let reply = SendMessage::markdown(
                msg.chat.id,
                self.render(lang, "learn_no_channels_found", &[]),
            );
            return self.api.send_message(&reply).await;
        }

        let keyboard = channels
            .iter()
            .map(|ch| {
                vec![InlineButton::callback(
                    ch.title.clone(),
                    callback::manage_page(ch.channel_id, 1),
                )]
            })
            .collect();
        let reply = SendMessage {
            chat_id: msg.chat.id,
            text: self.render(lang, "manage_prompt", &[]),
            parse_mode: None,
            direct_messages_topic_id: None,
            reply_markup: None,
        }
        .with_keyboard(keyboard);
        self.api.send_message(&reply).await
    }

    async fn handle_cancel(&self, msg: &Message, user: &User, lang: &str) -> Result<()> {
        let key = if self.sessions.get(user.id).is_some() {
            self.sessions.clear(user.id);
            "cancel_message"
        } else {
            "cancel_fail"
        };
        let reply = SendMessage::markdown(msg.chat.id, self.render(lang, key, &[]));
        self.api.send_message(&reply).await
    }

    /// `/learn`: offer the user's admin channels as a button list. Picking
    /// one starts the wizard (`learn_channel_<id>` callback).
    pub(crate) async fn handle_learn(&self, msg: &Message, user: &User, lang: &str) -> Result<()> {
        let channels = self.admin_channels(user.id).await?;
        self.send_channel_selection(msg.chat.id, &channels, lang).await
    }

    async fn send_channel_selection(
        &self,
        chat_id: i64,
        channels: &[RegisteredChannel],
        lang: &str,
    ) -> Result<()> {
        if channels.is_empty() {
            let reply =
                SendMessage::markdown(chat_id, self.render(lang, "learn_no_channels_found", &[]));
            return self.api.send_message(&reply).await;
        }

        let keyboard = channels
            .iter()
            .map(|ch| {
                vec![InlineButton::callback(
                    ch.title.clone(),
                    callback::learn_channel(ch.channel_id),
                )]
            })
            .collect();
        let reply = SendMessage {
            chat_id,
            text: self.render(lang, "learn_prompt_channel", &[]),
            parse_mode: None,
            direct_messages_topic_id: None,
            reply_markup: None,
        }
        .with_keyboard(keyboard);
        self.api.send_message(&reply).await
    }
}
