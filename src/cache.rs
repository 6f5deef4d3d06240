//! Bounded, byte-budgeted media cache with request coalescing.
//!
//! Export archives reference media by filename; the bytes live somewhere
//! expensive (disk, network, an archive member). [`MediaCache`] fronts a
//! caller-supplied [`MediaFetcher`] with an in-memory store bounded by a
//! byte budget. Concurrent requests for the same key issue exactly one
//! fetch; the rest wait and share the result.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::error::Result;

/// Source of media bytes, supplied by the caller.
///
/// Fetch failures propagate to every waiting caller and leave no cache
/// entry; the cache never retries on its own.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// One cached payload.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<Vec<u8>>,
    size: u64,
    /// Logical clock value of the most recent access.
    last_access: u64,
    #[allow(dead_code)]
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_bytes: u64,
    /// Monotonic logical clock; bumped on every access.
    clock: u64,
    /// Per-key fetch gates, live only while a miss is in flight. Held as
    /// weak references: when every caller drops out (completion, failure or
    /// cancellation) the gate dies on its own, and dead slots are pruned
    /// before the next gate is created.
    gates: HashMap<String, Weak<Mutex<()>>>,
}

/// Byte-budgeted LRU cache over a [`MediaFetcher`].
///
/// All mutation is serialized behind one async mutex; fetches run outside
/// it so slow media never blocks unrelated keys.
pub struct MediaCache<F> {
    fetcher: F,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl<F: MediaFetcher> MediaCache<F> {
    pub fn new(fetcher: F, config: CacheConfig) -> Self {
        Self {
            fetcher,
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the media bytes for `key`, fetching on a miss.
    ///
    /// Concurrent callers for the same key are coalesced behind a per-key
    /// gate: one fetch is issued and every waiter shares the resulting
    /// `Arc`. If the fetching caller is cancelled mid-flight the gate
    /// releases and the next waiter fetches itself, so a cancelled request
    /// never wedges the key.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's [`ChatloomError::Fetch`](crate::error::ChatloomError)
    /// without caching anything.
    pub async fn get(&self, key: &str) -> Result<Arc<Vec<u8>>> {
        let gate = {
            let mut state = self.state.lock().await;
            if let Some(payload) = Self::touch(&mut state, key) {
                return Ok(payload);
            }
            match state.gates.get(key).and_then(Weak::upgrade) {
                Some(gate) => gate,
                None => {
                    state.gates.retain(|_, g| g.strong_count() > 0);
                    let gate = Arc::new(Mutex::new(()));
                    state.gates.insert(key.to_string(), Arc::downgrade(&gate));
                    gate
                }
            }
        };

        let _fetching = gate.lock().await;

        // A coalesced waiter: the first holder may have filled the entry.
        {
            let mut state = self.state.lock().await;
            if let Some(payload) = Self::touch(&mut state, key) {
                return Ok(payload);
            }
        }

        let fetched = self.fetcher.fetch(key).await;

        let mut state = self.state.lock().await;
        state.gates.remove(key);
        let payload = Arc::new(fetched?);
        let size = payload.len() as u64;
        if size > self.config.budget_bytes {
            // Returned to the caller but never persisted.
            tracing::debug!(key, size, "payload exceeds cache budget");
            return Ok(payload);
        }

        if state.total_bytes + size > self.config.eviction_threshold() {
            self.evict(&mut state, size);
        }
        state.clock += 1;
        let clock = state.clock;
        state.total_bytes += size;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                payload: Arc::clone(&payload),
                size,
                last_access: clock,
                inserted_at: Instant::now(),
            },
        );
        Ok(payload)
    }

    /// Marks `key` as just accessed and returns its payload, if cached.
    fn touch(state: &mut CacheState, key: &str) -> Option<Arc<Vec<u8>>> {
        state.clock += 1;
        let clock = state.clock;
        let entry = state.entries.get_mut(key)?;
        entry.last_access = clock;
        Some(Arc::clone(&entry.payload))
    }

    /// Evicts in ascending last-access order until `incoming` fits under the
    /// eviction threshold.
    fn evict(&self, state: &mut CacheState, incoming: u64) {
        let threshold = self.config.eviction_threshold();
        let mut victims: Vec<(String, u64, u64)> = state
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.last_access, e.size))
            .collect();
        victims.sort_by_key(|&(_, last_access, _)| last_access);

        for (key, _, size) in victims {
            if state.total_bytes + incoming <= threshold {
                break;
            }
            state.entries.remove(&key);
            state.total_bytes -= size;
            tracing::debug!(key, size, "evicted from media cache");
        }
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Current resident byte total.
    pub async fn total_bytes(&self) -> u64 {
        self.state.lock().await.total_bytes
    }
}

impl<F> std::fmt::Debug for MediaCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
