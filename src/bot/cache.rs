//! Time-boxed cache of which channels a user administers.
//!
//! Computing the admin set means one `getChatAdministrators` call per
//! registered channel, so results are cached for a TTL (10 minutes by
//! default). An empty set is never served from cache — it is
//! indistinguishable from "not yet computed" and always forces a recompute.
//! Anything that can change a user's admin set (channel registration) must
//! call `invalidate`, otherwise the new channel stays invisible to its owner
//! until the TTL runs out.
//!
//! Simultaneous misses for the same user may recompute in parallel; the last
//! `set` wins. That duplication is cheaper than single-flight bookkeeping.

use crate::storage::RegisteredChannel;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry {
    channels: Vec<RegisteredChannel>,
    computed_at: Instant,
}

pub struct AdminCache {
    ttl: Duration,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl AdminCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The channels last computed for this user, or `None` on a miss
    /// (absent, expired, or empty).
    pub fn get(&self, user_id: i64) -> Option<Vec<RegisteredChannel>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&user_id)?;
        if entry.computed_at.elapsed() >= self.ttl {
            return None;
        }
        if entry.channels.is_empty() {
            return None;
        }
        Some(entry.channels.clone())
    }

    pub fn set(&self, user_id: i64, channels: Vec<RegisteredChannel>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            user_id,
            CacheEntry {
                channels,
                computed_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, user_id: i64) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&user_id);
        eprintln!("[bot] Admin cache invalidated for user {user_id}");
    }
}
