//! The bot core: long-poll dispatch loop, message/callback routing, and the
//! interactive session state machine.
//!
//! The poll loop advances a monotonic update offset and hands every update to
//! its own `tokio::spawn` task, so handlers never block the loop or each
//! other and may finish out of arrival order. All cross-task state lives in
//! the [`session::SessionStore`] and [`cache::AdminCache`], which serialize
//! access internally.

pub mod autoreply;
pub mod cache;
pub mod callback;
pub mod commands;
pub mod dashboard;
pub mod session;
pub mod wizard;

use crate::i18n::Catalog;
use crate::storage::{RegisteredChannel, Storage};
use crate::telegram::api::ChatApi;
use crate::telegram::{
    AnswerCallback, CallbackQuery, EditMessageText, InlineButton, Keyboard, Message, SendMessage,
    Update,
};
use cache::AdminCache;
use callback::CallbackAction;
use color_eyre::eyre::Result;
use commands::Command;
use session::{SessionStore, Step, UserSession};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Bot {
    pub(crate) api: Arc<dyn ChatApi>,
    pub(crate) store: Arc<dyn Storage>,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) sessions: SessionStore,
    pub(crate) admin_cache: AdminCache,
    /// Bot username, from getMe. Strips `/cmd@botname` suffixes and builds
    /// the add-to-channel link.
    pub(crate) username: String,
}

impl Bot {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: Arc<dyn Storage>,
        catalog: Arc<Catalog>,
        username: String,
        admin_cache_ttl: Duration,
    ) -> Self {
        Self {
            api,
            store,
            catalog,
            sessions: SessionStore::new(),
            admin_cache: AdminCache::new(admin_cache_ttl),
            username,
        }
    }

    /// Long-poll for updates until cancelled, spawning one handler task per
    /// update. Poll errors are logged and retried; handler errors are logged
    /// and isolated.
    pub async fn run(self: &Arc<Self>, cancel: CancellationToken) {
        let mut offset: i64 = 0;

        loop {
            let updates = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.api.get_updates(offset) => {
                    match result {
                        Ok(updates) => updates,
                        Err(e) => {
                            eprintln!("[bot] Poll error: {e}");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                    }
                }
            };

            for update in updates {
                offset = update.update_id + 1;

                let bot = Arc::clone(self);
                tokio::spawn(async move {
                    let update_id = update.update_id;
                    if let Err(e) = bot.handle_update(update).await {
                        eprintln!("[bot] Error handling update {update_id}: {e}");
                    }
                });
            }
        }

        eprintln!("[bot] Poll loop stopped");
    }

    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(cb) = update.callback_query {
            return self.handle_callback(cb).await;
        }
        if let Some(msg) = update.message {
            return self.handle_message(msg).await;
        }
        Ok(())
    }

    /// The user's display language: stored preference, then the platform's
    /// reported language code, then the catalog default.
    fn user_lang(&self, user_id: i64, reported: Option<&str>) -> String {
        match self.store.get_user_language(user_id) {
            Ok(Some(lang)) => lang,
            Ok(None) => reported
                .unwrap_or_else(|| self.catalog.default_lang())
                .to_owned(),
            Err(e) => {
                eprintln!("[bot] Error reading language for user {user_id}: {e}");
                self.catalog.default_lang().to_owned()
            }
        }
    }

    pub(crate) fn render(&self, lang: &str, key: &str, vars: &[(&str, &str)]) -> String {
        self.catalog.render(lang, key, vars)
    }

    // --- Message routing ---

    /// Precedence: session-free commands, then an active session, then
    /// `/learn`, then the auto-reply path for DM-topic messages.
    async fn handle_message(&self, msg: Message) -> Result<()> {
        let Some(user) = msg.from.clone() else {
            return Ok(());
        };
        let lang = self.user_lang(user.id, user.language_code.as_deref());

        let parsed = Command::parse(msg.text(), &self.username);
        if let Some((command, args)) = &parsed {
            if *command != Command::Learn {
                return self
                    .handle_command(*command, args, &msg, &user, &lang)
                    .await;
            }
        }

        if let Some(session) = self.sessions.get(user.id) {
            return self.handle_session_message(&msg, &user, session, &lang).await;
        }

        if matches!(parsed, Some((Command::Learn, _))) {
            return self.handle_learn(&msg, &user, &lang).await;
        }

        if msg.chat.is_direct_messages && msg.topic_id().is_some() {
            return self.handle_auto_reply(&msg, &user).await;
        }

        Ok(())
    }

    // --- Callback routing ---

    async fn handle_callback(&self, cb: CallbackQuery) -> Result<()> {
        let user_id = cb.from.id;
        let lang = self.user_lang(user_id, cb.from.language_code.as_deref());

        let Some(origin) = cb.message.as_ref() else {
            // Originating message too old for the platform to include.
            return self.api.answer_callback(&AnswerCallback::ack(&cb.id)).await;
        };
        let chat_id = origin.chat.id;
        let message_id = origin.message_id;

        let data = cb.data.as_deref().unwrap_or_default();
        let Some(action) = CallbackAction::parse(data) else {
            eprintln!("[bot] Ignoring malformed callback payload from user {user_id}: {data:?}");
            return self.api.answer_callback(&AnswerCallback::ack(&cb.id)).await;
        };

        eprintln!("[bot] Callback from user {user_id}: {data}");

        // Alert-style answers happen inside their handlers; everything else
        // gets a plain acknowledgement up front to dismiss the spinner.
        if !matches!(
            action,
            CallbackAction::SetLang(_) | CallbackAction::DeleteConfirm { .. }
        ) {
            self.api.answer_callback(&AnswerCallback::ack(&cb.id)).await?;
        }

        match action {
            CallbackAction::Noop => Ok(()),

            CallbackAction::HelpMain => {
                let edit = EditMessageText::markdown(
                    chat_id,
                    message_id,
                    self.render(&lang, "help_main_text", &[]),
                )
                .with_keyboard(self.help_menu_keyboard(&lang));
                self.api.edit_message_text(&edit).await
            }

            CallbackAction::HelpTopic(topic) => {
                let keyboard = vec![vec![InlineButton::callback(
                    self.render(&lang, "back_button", &[]),
                    "help_main",
                )]];
                let edit = EditMessageText::markdown(
                    chat_id,
                    message_id,
                    self.render(&lang, topic.text_key(), &[]),
                )
                .with_keyboard(keyboard);
                self.api.edit_message_text(&edit).await
            }

            CallbackAction::LangPrompt => self.send_language_prompt(chat_id, &lang).await,

            CallbackAction::SetLang(code) => self.handle_set_lang(&cb, chat_id, message_id, &code).await,

            CallbackAction::LearnChannel(channel_id) => {
                self.sessions.set(user_id, UserSession::learning(channel_id));
                let edit = EditMessageText::markdown(
                    chat_id,
                    message_id,
                    self.render(&lang, "learn_channel_selected", &[]),
                );
                self.api.edit_message_text(&edit).await
            }

            CallbackAction::LearnType(kind) => {
                self.handle_learn_type(user_id, chat_id, message_id, kind, &lang)
                    .await
            }

            CallbackAction::ManagePage { channel_id, page } => {
                self.send_dashboard(chat_id, message_id, &lang, channel_id, page)
                    .await
            }

            CallbackAction::DeletePrompt {
                trigger_id,
                channel_id,
                page,
            } => {
                self.handle_delete_prompt(chat_id, message_id, &lang, trigger_id, channel_id, page)
                    .await
            }

            CallbackAction::DeleteConfirm {
                trigger_id,
                channel_id,
                page,
            } => {
                self.handle_delete_confirm(&cb, chat_id, message_id, &lang, trigger_id, channel_id, page)
                    .await
            }

            CallbackAction::PlaceholderHelp => {
                let keyboard = vec![vec![InlineButton::callback(
                    self.render(&lang, "back_button", &[]),
                    "back_to_response_prompt",
                )]];
                let edit = EditMessageText::markdown(
                    chat_id,
                    message_id,
                    self.render(&lang, "placeholder_help_text", &[]),
                )
                .with_keyboard(keyboard);
                self.api.edit_message_text(&edit).await
            }

            CallbackAction::BackToResponsePrompt => {
                let session = self.sessions.get(user_id);
                match session {
                    Some(session) if session.step == Step::AwaitingText => {
                        let edit = EditMessageText::markdown(
                            chat_id,
                            message_id,
                            self.render(&lang, "learn_awaiting_text", &[]),
                        )
                        .with_keyboard(wizard::placeholder_help_keyboard(self, &lang));
                        self.api.edit_message_text(&edit).await
                    }
                    _ => self.session_expired(chat_id, message_id, &lang).await,
                }
            }
        }
    }

    async fn handle_set_lang(
        &self,
        cb: &CallbackQuery,
        chat_id: i64,
        message_id: i64,
        code: &str,
    ) -> Result<()> {
        if let Err(e) = self.store.set_user_language(cb.from.id, code) {
            eprintln!("[bot] Failed to set language for user {}: {e}", cb.from.id);
            return self.api.answer_callback(&AnswerCallback::ack(&cb.id)).await;
        }

        // Confirm in the language the user just picked.
        let text = self.render(code, "lang_updated", &[]);
        self.api
            .answer_callback(&AnswerCallback::alert(&cb.id, text.clone()))
            .await?;

        let edit = EditMessageText {
            chat_id,
            message_id,
            text,
            parse_mode: None,
            reply_markup: None,
        };
        self.api.edit_message_text(&edit).await
    }

    async fn handle_learn_type(
        &self,
        user_id: i64,
        chat_id: i64,
        message_id: i64,
        kind: crate::storage::ResponseKind,
        lang: &str,
    ) -> Result<()> {
        let Some(mut session) = self.sessions.get(user_id) else {
            // Session gone (expired or cancelled) — no implicit re-creation.
            return self.session_expired(chat_id, message_id, lang).await;
        };

        session.response_type = Some(kind);
        session.step = Step::awaiting(kind);
        self.sessions.set(user_id, session);

        let prompt_key = format!("learn_awaiting_{kind}");
        let mut edit =
            EditMessageText::markdown(chat_id, message_id, self.render(lang, &prompt_key, &[]));
        if kind == crate::storage::ResponseKind::Text {
            edit = edit.with_keyboard(wizard::placeholder_help_keyboard(self, lang));
        }
        self.api.edit_message_text(&edit).await
    }

    async fn handle_delete_prompt(
        &self,
        chat_id: i64,
        message_id: i64,
        lang: &str,
        trigger_id: i64,
        channel_id: i64,
        page: usize,
    ) -> Result<()> {
        let record = match self.store.get_trigger_by_id(trigger_id)? {
            Some(record) => record,
            // Already gone — nothing to confirm.
            None => return Ok(()),
        };

        let keyboard = vec![vec![
            InlineButton::callback(
                self.render(lang, "confirm_delete_button", &[]),
                callback::del_confirm(trigger_id, channel_id, page),
            ),
            InlineButton::callback(
                self.render(lang, "cancel_delete_button", &[]),
                callback::manage_page(channel_id, page),
            ),
        ]];
        let edit = EditMessageText::markdown(
            chat_id,
            message_id,
            self.render(lang, "confirm_delete_prompt", &[("trigger", &record.trigger_text)]),
        )
        .with_keyboard(keyboard);
        self.api.edit_message_text(&edit).await
    }

    async fn handle_delete_confirm(
        &self,
        cb: &CallbackQuery,
        chat_id: i64,
        message_id: i64,
        lang: &str,
        trigger_id: i64,
        channel_id: i64,
        page: usize,
    ) -> Result<()> {
        // Fetch first so the alert can name the trigger; a record that
        // vanished between prompt and confirm is not an error.
        let record = self.store.get_trigger_by_id(trigger_id).unwrap_or_default();

        if let Err(e) = self.store.delete_trigger(trigger_id) {
            eprintln!("[bot] Failed to delete trigger {trigger_id}: {e}");
            self.api.answer_callback(&AnswerCallback::ack(&cb.id)).await?;
        } else if let Some(record) = record {
            let text = self.render(lang, "delete_success_alert", &[("trigger", &record.trigger_text)]);
            self.api
                .answer_callback(&AnswerCallback::alert(&cb.id, text))
                .await?;
        } else {
            self.api.answer_callback(&AnswerCallback::ack(&cb.id)).await?;
        }

        self.send_dashboard(chat_id, message_id, lang, channel_id, page)
            .await
    }

    /// Render the management dashboard into an existing message.
    pub(crate) async fn send_dashboard(
        &self,
        chat_id: i64,
        message_id: i64,
        lang: &str,
        channel_id: i64,
        page: usize,
    ) -> Result<()> {
        let triggers = self.store.list_triggers(channel_id)?;
        let title = match self
            .api
            .get_chat(&crate::telegram::ChatRef::Id(channel_id))
            .await
        {
            Ok(info) => info.title.unwrap_or_else(|| channel_id.to_string()),
            Err(_) => channel_id.to_string(),
        };

        let dash = dashboard::build(&self.catalog, lang, channel_id, &title, &triggers, page);
        let edit = EditMessageText::markdown(chat_id, message_id, dash.text)
            .with_keyboard(dash.keyboard);
        self.api.edit_message_text(&edit).await
    }

    pub(crate) async fn session_expired(
        &self,
        chat_id: i64,
        message_id: i64,
        lang: &str,
    ) -> Result<()> {
        let edit = EditMessageText {
            chat_id,
            message_id,
            text: self.render(lang, "session_expired", &[]),
            parse_mode: None,
            reply_markup: None,
        };
        self.api.edit_message_text(&edit).await
    }

    pub(crate) fn help_menu_keyboard(&self, lang: &str) -> Keyboard {
        vec![
            vec![
                InlineButton::callback(self.render(lang, "help_register_button", &[]), "help_register"),
                InlineButton::callback(self.render(lang, "help_learn_button", &[]), "help_learn"),
            ],
            vec![
                InlineButton::callback(self.render(lang, "help_manage_button", &[]), "help_manage"),
                InlineButton::callback(self.render(lang, "help_formatting_button", &[]), "help_formatting"),
            ],
            vec![
                InlineButton::callback(self.render(lang, "help_lang_button", &[]), "help_lang"),
                InlineButton::callback(self.render(lang, "help_cancel_button", &[]), "help_cancel"),
            ],
        ]
    }

    pub(crate) async fn send_language_prompt(&self, chat_id: i64, lang: &str) -> Result<()> {
        let keyboard = vec![
            vec![InlineButton::callback("🇬🇧 English", "lang_en")],
            vec![InlineButton::callback("🇮🇩 Indonesia", "lang_id")],
            vec![InlineButton::callback("🇷🇺 Русский", "lang_ru")],
        ];
        let msg = SendMessage {
            chat_id,
            text: self.render(lang, "lang_prompt", &[]),
            parse_mode: None,
            direct_messages_topic_id: None,
            reply_markup: None,
        }
        .with_keyboard(keyboard);
        self.api.send_message(&msg).await
    }

    /// Live admin check against the platform — used for trust-establishing
    /// actions (registration), never satisfied from the cache.
    pub(crate) async fn is_user_admin(&self, chat_id: i64, user_id: i64) -> Result<bool> {
        let admins = self.api.get_chat_administrators(chat_id).await?;
        Ok(admins.iter().any(|member| member.user.id == user_id))
    }

    /// The registered channels this user administers, cache-first.
    ///
    /// On a miss every registered channel is checked against the live API and
    /// the result cached. Racing misses for the same user recompute in
    /// parallel; the last write wins.
    pub(crate) async fn admin_channels(&self, user_id: i64) -> Result<Vec<RegisteredChannel>> {
        if let Some(channels) = self.admin_cache.get(user_id) {
            eprintln!("[bot] Admin cache hit for user {user_id}");
            return Ok(channels);
        }
        eprintln!("[bot] Admin cache miss for user {user_id}, performing full check");

        let mut admin_channels = Vec::new();
        for channel in self.store.registered_channels()? {
            match self.is_user_admin(channel.channel_id, user_id).await {
                Ok(true) => admin_channels.push(channel),
                Ok(false) => {}
                Err(e) => {
                    eprintln!(
                        "[bot] Admin check failed for channel {} user {user_id}: {e}",
                        channel.channel_id
                    );
                }
            }
        }

        self.admin_cache.set(user_id, admin_channels.clone());
        Ok(admin_channels)
    }
}
