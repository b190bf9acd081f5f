//! Short-lived cache of recently seen messages, used for reply correlation.

use std::time::{Duration, Instant};

use {async_trait::async_trait, dashmap::DashMap, tracing::trace};

use crate::message::Message;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait MessageCache: Send + Sync {
    async fn set(&self, key: &str, message: Message, ttl: Duration);
    async fn get(&self, key: &str) -> Option<Message>;
}

/// In-memory [`MessageCache`]. Expired entries are swept on every `set`
/// and evicted lazily on read.
#[derive(Default)]
pub struct MemoryMessageCache {
    /// `None` expiry means the TTL did not fit in an `Instant`: never expires.
    entries: DashMap<String, (Message, Option<Instant>)>,
}

impl MemoryMessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| is_live(*expires_at, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_none_or(|at| at > now)
}

#[async_trait]
impl MessageCache for MemoryMessageCache {
    async fn set(&self, key: &str, message: Message, ttl: Duration) {
        let purged = self.purge_expired();
        trace!(key, ttl_secs = ttl.as_secs(), purged, "caching message");
        let expires_at = Instant::now().checked_add(ttl);
        self.entries.insert(key.to_owned(), (message, expires_at));
    }

    async fn get(&self, key: &str) -> Option<Message> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| (entry.0.clone(), is_live(entry.1, now)));
        match hit {
            Some((message, true)) => Some(message),
            Some((_, false)) => {
                self.entries.remove(key);
                None
            },
            None => None,
        }
    }
}
