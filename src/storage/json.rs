//! JSON-file storage backend.
//!
//! Everything lives in one file (default `parrot.json`), loaded at startup and
//! rewritten after each mutation. Writes go through a temp file + rename so a
//! crash mid-write never leaves a torn state file.

use super::{RegisteredChannel, ResponseKind, Storage, TriggerRecord};
use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    /// Next id handed out by `upsert_trigger` for new records.
    #[serde(default = "first_id")]
    next_trigger_id: i64,

    #[serde(default)]
    triggers: Vec<TriggerRecord>,

    /// Preferred language per user id.
    #[serde(default)]
    user_languages: HashMap<i64, String>,

    #[serde(default)]
    channels: Vec<RegisteredChannel>,
}

fn first_id() -> i64 {
    1
}

/// File-backed [`Storage`] implementation.
pub struct JsonStorage {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonStorage {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let state = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .wrap_err_with(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut state = StoreState::default();
                state.next_trigger_id = 1;
                state
            }
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("failed to read {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    /// Write the state file atomically (temp file + rename).
    fn save(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, content)
            .wrap_err_with(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .wrap_err_with(|| format!("failed to rename {} into place", tmp.display()))?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        // A poisoned lock means another handler panicked mid-write; the state
        // itself is still consistent (mutations happen in place, save is atomic).
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for JsonStorage {
    fn upsert_trigger(&self, mut record: TriggerRecord) -> Result<i64> {
        record.trigger_text = record.trigger_text.to_lowercase();

        let mut state = self.lock();
        let id = match state
            .triggers
            .iter_mut()
            .find(|t| t.channel_id == record.channel_id && t.trigger_text == record.trigger_text)
        {
            Some(existing) => {
                record.id = existing.id;
                *existing = record;
                existing.id
            }
            None => {
                record.id = state.next_trigger_id;
                state.next_trigger_id += 1;
                let id = record.id;
                state.triggers.push(record);
                id
            }
        };
        self.save(&state)?;
        eprintln!("[storage] Stored trigger {id}");
        Ok(id)
    }

    fn get_trigger(&self, channel_id: i64, trigger: &str) -> Result<Option<TriggerRecord>> {
        let needle = trigger.to_lowercase();
        let state = self.lock();
        Ok(state
            .triggers
            .iter()
            .find(|t| t.channel_id == channel_id && t.trigger_text == needle)
            .cloned())
    }

    fn get_trigger_by_id(&self, id: i64) -> Result<Option<TriggerRecord>> {
        let state = self.lock();
        Ok(state.triggers.iter().find(|t| t.id == id).cloned())
    }

    fn list_triggers(&self, channel_id: i64) -> Result<Vec<TriggerRecord>> {
        let state = self.lock();
        Ok(state
            .triggers
            .iter()
            .filter(|t| t.channel_id == channel_id)
            .cloned()
            .collect())
    }

    fn delete_trigger(&self, id: i64) -> Result<()> {
        let mut state = self.lock();
        let before = state.triggers.len();
        state.triggers.retain(|t| t.id != id);
        if state.triggers.len() != before {
            self.save(&state)?;
        }
        Ok(())
    }

    fn get_user_language(&self, user_id: i64) -> Result<Option<String>> {
        let state = self.lock();
        Ok(state.user_languages.get(&user_id).cloned())
    }

    fn set_user_language(&self, user_id: i64, lang: &str) -> Result<()> {
        let mut state = self.lock();
        state.user_languages.insert(user_id, lang.to_owned());
        self.save(&state)
    }

    fn register_channel(&self, channel_id: i64, title: &str, user_id: i64) -> Result<()> {
        let mut state = self.lock();
        let entry = RegisteredChannel {
            channel_id,
            title: title.to_owned(),
            registered_by_user_id: user_id,
            registered_at: Utc::now(),
        };
        match state
            .channels
            .iter_mut()
            .find(|c| c.channel_id == channel_id)
        {
            Some(existing) => *existing = entry,
            None => state.channels.push(entry),
        }
        self.save(&state)
    }

    fn registered_channels(&self) -> Result<Vec<RegisteredChannel>> {
        let state = self.lock();
        Ok(state.channels.clone())
    }
}

/// Convenience for building trigger records before the store assigns an id.
pub fn new_trigger(
    channel_id: i64,
    trigger_text: &str,
    response_type: ResponseKind,
    response_text: String,
    response_file_id: Option<String>,
) -> TriggerRecord {
    TriggerRecord {
        id: 0,
        channel_id,
        trigger_text: trigger_text.to_owned(),
        response_type,
        response_text,
        response_file_id,
    }
}
