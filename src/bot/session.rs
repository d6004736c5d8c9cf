//! Per-user interactive session state.
//!
//! A session exists for a user exactly while they are mid-wizard (registering
//! a channel or teaching a trigger). Handlers for different updates run
//! concurrently, so the store hands out copies: a `get` is a snapshot, and a
//! later `set` writes the whole record back atomically. Duplicate updates for
//! the same user race last-write-wins.

use crate::storage::ResponseKind;
use std::collections::HashMap;
use std::sync::RwLock;

/// Where a user currently is in an interactive flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingRegistrationForward,
    AwaitingTrigger,
    AwaitingResponseType,
    AwaitingText,
    AwaitingPhoto,
    AwaitingSticker,
    AwaitingDocument,
    AwaitingAnimation,
    AwaitingAudio,
}

impl Step {
    /// The step that waits for a response of the given kind.
    pub fn awaiting(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Text => Step::AwaitingText,
            ResponseKind::Photo => Step::AwaitingPhoto,
            ResponseKind::Sticker => Step::AwaitingSticker,
            ResponseKind::Document => Step::AwaitingDocument,
            ResponseKind::Animation => Step::AwaitingAnimation,
            ResponseKind::Audio => Step::AwaitingAudio,
        }
    }
}

/// One user's in-flight wizard state.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    pub step: Step,
    /// Target channel for the trigger being learned. Unused for registration.
    pub channel_id: i64,
    /// The pending trigger phrase, set when leaving `AwaitingTrigger`.
    pub trigger_text: String,
    /// The chosen media kind, set when leaving `AwaitingResponseType`.
    pub response_type: Option<ResponseKind>,
}

impl UserSession {
    /// Fresh registration flow: waiting for a forwarded channel message.
    pub fn registration() -> Self {
        Self {
            step: Step::AwaitingRegistrationForward,
            channel_id: 0,
            trigger_text: String::new(),
            response_type: None,
        }
    }

    /// Fresh learn wizard: channel picked, waiting for the trigger phrase.
    pub fn learning(channel_id: i64) -> Self {
        Self {
            step: Step::AwaitingTrigger,
            channel_id,
            trigger_text: String::new(),
            response_type: None,
        }
    }
}

/// Concurrent map of user id → session, copy-on-read.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, UserSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: i64, session: UserSession) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(user_id, session);
    }

    /// Snapshot of the user's session, if any. Mutating the returned value
    /// has no effect until it is written back with `set`.
    pub fn get(&self, user_id: i64) -> Option<UserSession> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(&user_id).cloned()
    }

    pub fn clear(&self, user_id: i64) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&user_id);
    }
}
