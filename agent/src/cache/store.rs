//! Per-pair TTL cache store

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::EvictionPolicy;
use crate::conn::ToolResult;

/// A cached tool result with its lifecycle metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ToolResult,
    pub created_at: Instant,
    pub ttl: Duration,
    pub access_count: u64,
    last_access: Instant,
    size_bytes: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > self.ttl
    }

    fn expires_at(&self) -> Instant {
        self.created_at + self.ttl
    }
}

/// Size-only statistics for a single store
///
/// Hit/miss counters live with the owning manager; stores only know what they
/// currently hold and what they have evicted.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreStats {
    pub total_keys: usize,
    pub total_size_bytes: u64,
    pub evictions: u64,
}

struct StoreState {
    entries: HashMap<String, CacheEntry>,
    evictions: u64,
}

/// TTL cache for a single (tool, server) pair
///
/// Entries move absent -> present -> expired or deleted; writes replace
/// atomically, with no intermediate state. Expiry is lazy (checked on read),
/// with `cleanup` available for periodic memory reclamation. The store is
/// bounded by `max_keys`: inserting a new key at capacity evicts one entry
/// per the configured policy. A bound of zero disables the limit.
pub struct ToolCache {
    state: RwLock<StoreState>,
    max_keys: usize,
    policy: EvictionPolicy,
}

impl ToolCache {
    pub fn new(max_keys: usize, policy: EvictionPolicy) -> Self {
        Self {
            state: RwLock::new(StoreState {
                entries: HashMap::new(),
                evictions: 0,
            }),
            max_keys,
            policy,
        }
    }

    /// Look up an entry, expiring it lazily
    ///
    /// A hit bumps the entry's access count; an expired entry is removed and
    /// reported as a miss.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return None,
        };
        if expired {
            state.entries.remove(key);
            return None;
        }

        let entry = state.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_access = now;
        Some(entry.clone())
    }

    /// Store a result, overwriting any existing entry for the key
    pub async fn set(&self, key: String, result: ToolResult, ttl: Duration) {
        let size_bytes = serde_json::to_vec(&result)
            .map(|v| v.len() as u64)
            .unwrap_or(0);
        let now = Instant::now();

        let mut state = self.state.write().await;

        if self.max_keys > 0
            && !state.entries.contains_key(&key)
            && state.entries.len() >= self.max_keys
        {
            Self::evict_one(&mut state, self.policy);
        }

        state.entries.insert(
            key,
            CacheEntry {
                result,
                created_at: now,
                ttl,
                access_count: 0,
                last_access: now,
                size_bytes,
            },
        );
    }

    /// Remove a specific key; returns whether it was present
    pub async fn delete(&self, key: &str) -> bool {
        let mut state = self.state.write().await;
        state.entries.remove(key).is_some()
    }

    /// Remove all entries
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
    }

    /// Check presence with the same expiry rule as `get`, but without
    /// counting an access
    pub async fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            state.entries.remove(key);
            return false;
        }
        true
    }

    /// Sweep out expired entries; returns how many were removed
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        before - state.entries.len()
    }

    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Point-in-time snapshot of what the store holds
    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            total_keys: state.entries.len(),
            total_size_bytes: state.entries.values().map(|e| e.size_bytes).sum(),
            evictions: state.evictions,
        }
    }

    fn evict_one(state: &mut StoreState, policy: EvictionPolicy) {
        let victim = match policy {
            EvictionPolicy::Lru => state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone()),
            EvictionPolicy::Ttl => state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at())
                .map(|(key, _)| key.clone()),
        };

        if let Some(key) = victim {
            state.entries.remove(&key);
            state.evictions += 1;
            tracing::debug!("Evicted cache entry '{}'", key);
        }
    }
}
