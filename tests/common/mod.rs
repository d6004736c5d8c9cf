//! Shared test harness: an in-memory fake of the chat platform plus builders
//! for updates, so flows can be driven end to end without the network.

use async_trait::async_trait;
use color_eyre::eyre::Result;
use parrot::bot::Bot;
use parrot::i18n::Catalog;
use parrot::storage::json::JsonStorage;
use parrot::telegram::api::ChatApi;
use parrot::telegram::{
    AnswerCallback, BotInfo, CallbackQuery, Chat, ChatInfo, ChatMember, ChatRef, DirectMessagesTopic,
    EditMessageText, Message, SendMedia, SendMessage, Update, User,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every outbound call and serves scripted chat/admin lookups.
#[derive(Default)]
pub struct FakeApi {
    pub sent: Mutex<Vec<SendMessage>>,
    pub edited: Mutex<Vec<EditMessageText>>,
    pub answered: Mutex<Vec<AnswerCallback>>,
    pub media: Mutex<Vec<SendMedia>>,

    /// Scripted `getChat` results, keyed by id or @username.
    pub chats: Mutex<HashMap<String, ChatInfo>>,
    /// Scripted admin user ids per chat. Chats absent from the map error,
    /// which is what the live API does for chats the bot can't see.
    pub admins: Mutex<HashMap<i64, Vec<i64>>>,
    /// Every chat id passed to `getChatAdministrators`, in call order.
    pub admin_calls: Mutex<Vec<i64>>,
}

impl FakeApi {
    pub fn add_chat(&self, id: i64, title: &str) {
        self.chats.lock().unwrap().insert(
            id.to_string(),
            ChatInfo {
                id,
                title: Some(title.to_owned()),
                parent_chat: None,
            },
        );
    }

    /// A channel's DM chat: `getChat` on it points back at the channel.
    pub fn add_dm_chat(&self, dm_chat_id: i64, parent_channel_id: i64) {
        self.chats.lock().unwrap().insert(
            dm_chat_id.to_string(),
            ChatInfo {
                id: dm_chat_id,
                title: None,
                parent_chat: Some(parrot::telegram::ParentChat {
                    id: parent_channel_id,
                }),
            },
        );
    }

    pub fn set_admins(&self, chat_id: i64, user_ids: &[i64]) {
        self.admins.lock().unwrap().insert(chat_id, user_ids.to_vec());
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
    }

    pub fn last_sent(&self) -> SendMessage {
        self.sent.lock().unwrap().last().cloned().expect("no message sent")
    }

    pub fn last_edit(&self) -> EditMessageText {
        self.edited.lock().unwrap().last().cloned().expect("no message edited")
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn get_updates(&self, _offset: i64) -> Result<Vec<Update>> {
        Ok(Vec::new())
    }

    async fn send_message(&self, msg: &SendMessage) -> Result<()> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()> {
        self.edited.lock().unwrap().push(edit.clone());
        Ok(())
    }

    async fn answer_callback(&self, answer: &AnswerCallback) -> Result<()> {
        self.answered.lock().unwrap().push(answer.clone());
        Ok(())
    }

    async fn send_media(&self, media: &SendMedia) -> Result<()> {
        self.media.lock().unwrap().push(media.clone());
        Ok(())
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>> {
        self.admin_calls.lock().unwrap().push(chat_id);
        let admins = self.admins.lock().unwrap();
        let Some(user_ids) = admins.get(&chat_id) else {
            color_eyre::eyre::bail!("chat {chat_id} not found");
        };
        Ok(user_ids
            .iter()
            .map(|&id| ChatMember {
                user: User {
                    id,
                    ..User::default()
                },
                status: "administrator".into(),
            })
            .collect())
    }

    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo> {
        let chats = self.chats.lock().unwrap();
        chats
            .get(&chat.to_string())
            .cloned()
            .ok_or_else(|| color_eyre::eyre::eyre!("chat {chat} not found"))
    }

    async fn get_me(&self) -> Result<BotInfo> {
        Ok(BotInfo {
            id: 42,
            username: "parrotbot".into(),
        })
    }
}

pub struct Fixture {
    pub bot: Arc<Bot>,
    pub api: Arc<FakeApi>,
    pub store: Arc<JsonStorage>,
    _dir: tempfile::TempDir,
}

/// Bot wired to a fake API, a temp-file store, and the real locale files.
pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(JsonStorage::open(&dir.path().join("state.json")).unwrap());

    let locales = Path::new(env!("CARGO_MANIFEST_DIR")).join("locales");
    let catalog = Catalog::load(&locales, "en").unwrap();

    let bot = Arc::new(Bot::new(
        api.clone(),
        store.clone(),
        Arc::new(catalog),
        "parrotbot".into(),
        Duration::from_secs(600),
    ));
    Fixture {
        bot,
        api,
        store,
        _dir: dir,
    }
}

// --- Update builders ---

pub fn user(id: i64) -> User {
    User {
        id,
        first_name: "Ann".into(),
        username: None,
        language_code: Some("en".into()),
    }
}

pub fn text_update(chat_id: i64, from: i64, text: &str) -> Update {
    Update {
        update_id: 1,
        message: Some(Message {
            message_id: 10,
            from: Some(user(from)),
            chat: Chat {
                id: chat_id,
                ..Chat::default()
            },
            text: Some(text.to_owned()),
            ..Message::default()
        }),
        callback_query: None,
    }
}

/// A subscriber message inside a channel's DM topic.
pub fn dm_topic_update(dm_chat_id: i64, topic_id: i64, from: i64, text: &str) -> Update {
    let mut update = text_update(dm_chat_id, from, text);
    let msg = update.message.as_mut().unwrap();
    msg.chat.is_direct_messages = true;
    msg.direct_messages_topic = Some(DirectMessagesTopic { topic_id });
    update
}

pub fn callback_update(chat_id: i64, from: i64, data: &str) -> Update {
    Update {
        update_id: 2,
        message: None,
        callback_query: Some(CallbackQuery {
            id: "cb1".into(),
            from: user(from),
            message: Some(Message {
                message_id: 20,
                chat: Chat {
                    id: chat_id,
                    ..Chat::default()
                },
                ..Message::default()
            }),
            data: Some(data.to_owned()),
        }),
    }
}
