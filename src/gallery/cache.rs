//! Media payload cache
//!
//! Keeps fully loaded payloads keyed by media id using an LRU policy, so
//! revisiting a recently viewed item does not hit the backend again.
//! Entries are independent of window membership.

use crate::api::{ApiError, MediaId, Payload};
use log::debug;
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;

/// Default number of payloads kept in memory
pub const DEFAULT_CAPACITY: usize = 100;

/// A cached payload with its access stamp
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: MediaId,
    pub payload: Payload,
    /// Logical time of the most recent access; larger is more recent
    pub last_access: u64,
}

/// LRU cache of loaded payloads
pub struct MediaCache {
    entries: LruCache<MediaId, CacheEntry>,
    clock: u64,
}

impl MediaCache {
    /// Creates a cache holding at most `capacity` payloads (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Returns the payload for `id`, loading it on a miss
    ///
    /// A hit refreshes the entry's access stamp. A miss awaits `load`; the
    /// result is admitted only if the load succeeded, so a failure leaves no
    /// slot behind.
    ///
    /// # Errors
    ///
    /// Returns whatever error `load` produced.
    pub async fn get<F, Fut>(&mut self, id: MediaId, load: F) -> Result<Payload, ApiError>
    where
        F: FnOnce(MediaId) -> Fut,
        Fut: Future<Output = Result<Payload, ApiError>>,
    {
        if let Some(payload) = self.lookup(id) {
            return Ok(payload);
        }

        let payload = load(id).await?;
        self.admit(id, payload.clone());
        Ok(payload)
    }

    /// Returns a cached payload and marks it as used
    pub fn lookup(&mut self, id: MediaId) -> Option<Payload> {
        let stamp = self.tick();
        match self.entries.get_mut(&id) {
            Some(entry) => {
                debug!("Cache HIT: {id}");
                entry.last_access = stamp;
                Some(entry.payload.clone())
            }
            None => {
                debug!("Cache MISS: {id}");
                None
            }
        }
    }

    /// Stores a payload, evicting the least recently used entry when full
    ///
    /// Returns the id of the evicted entry, if any. Re-admitting an id that is
    /// already cached replaces its payload and evicts nothing.
    pub fn admit(&mut self, id: MediaId, payload: Payload) -> Option<MediaId> {
        let last_access = self.tick();
        let entry = CacheEntry {
            id,
            payload,
            last_access,
        };
        match self.entries.push(id, entry) {
            Some((evicted, _)) if evicted != id => {
                debug!("Cache EVICT: {evicted} (admitting {id})");
                Some(evicted)
            }
            _ => {
                debug!("Cache PUT: {id}");
                None
            }
        }
    }

    /// Drops a payload, e.g. after the media was deleted
    pub fn remove(&mut self, id: MediaId) -> bool {
        self.entries.pop(&id).is_some()
    }

    /// Checks for `id` without touching its access stamp
    #[must_use]
    pub fn contains(&self, id: MediaId) -> bool {
        self.entries.contains(&id)
    }

    /// The access stamp of `id`, without touching it
    #[must_use]
    pub fn last_access(&self, id: MediaId) -> Option<u64> {
        self.entries.peek(&id).map(|entry| entry.last_access)
    }

    /// The entry that would be evicted next
    #[must_use]
    pub fn oldest(&self) -> Option<MediaId> {
        self.entries.peek_lru().map(|(id, _)| *id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MediaCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
