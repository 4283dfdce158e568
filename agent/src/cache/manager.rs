//! Cache-aware tool execution
//!
//! Owns one `ToolCache` per (tool, server) pair and routes execution through
//! cache-or-execute. Failed executions are never cached, so a transient tool
//! error cannot be replayed from the cache indefinitely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::CacheConfig;
use crate::conn::{ToolExecutor, ToolInvocation, ToolResult};
use crate::error::ToolServerError;

use super::key::CacheKey;
use super::store::ToolCache;

/// Aggregated cache statistics across all (tool, server) pairs
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub total_keys: usize,
    pub total_size_bytes: u64,
}

/// Manager routing tool executions through per-pair caches
///
/// Construct one per application and share it behind an `Arc`. The executor
/// is injected so cache-aware execution works against anything that can run
/// tools, not just the connection manager.
pub struct CacheManager {
    config: CacheConfig,
    executor: Arc<dyn ToolExecutor>,
    caches: RwLock<HashMap<String, Arc<ToolCache>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    pub fn new(config: CacheConfig, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            config,
            executor,
            caches: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn pair_key(tool: &str, server: &str) -> String {
        format!("{}:{}", tool, server)
    }

    /// Cache for a (tool, server) pair, created lazily on first use
    ///
    /// Pairs are never merged or split once created.
    pub async fn cache_for(&self, tool: &str, server: &str) -> Arc<ToolCache> {
        let key = Self::pair_key(tool, server);

        {
            let caches = self.caches.read().await;
            if let Some(cache) = caches.get(&key) {
                return Arc::clone(cache);
            }
        }

        let mut caches = self.caches.write().await;
        Arc::clone(caches.entry(key).or_insert_with(|| {
            Arc::new(ToolCache::new(
                self.config.max_keys,
                self.config.eviction_policy,
            ))
        }))
    }

    /// Execute a tool, consulting the pair's cache first
    ///
    /// The check-execute-store sequence is not atomic across callers hitting
    /// the same key: two concurrent misses may both execute the tool and both
    /// write the cache, last write wins. Accepted on the assumption that
    /// tools are idempotent or cheap to duplicate.
    pub async fn execute_with_cache(
        &self,
        invocation: ToolInvocation,
    ) -> Result<ToolResult, ToolServerError> {
        let server = match invocation.server.clone() {
            Some(server) => server,
            None => self
                .executor
                .resolve_server(&invocation.tool)
                .await
                .ok_or_else(|| ToolServerError::ToolNotFound(invocation.tool.clone()))?,
        };

        let key = CacheKey::new(&invocation.tool, &server, invocation.arguments.as_ref());

        if self.config.enabled {
            let cache = self.cache_for(&invocation.tool, &server).await;
            if let Some(entry) = cache.get(&key.storage_key()).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache hit for tool '{}' on '{}'", invocation.tool, server);
                return Ok(entry.result);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = self
            .executor
            .execute_tool(&invocation.tool, invocation.arguments)
            .await?;

        // Only successful results are cached
        if self.config.enabled && result.success {
            let ttl = self.config.ttl_for(&invocation.tool);
            let cache = self.cache_for(&invocation.tool, &server).await;
            cache.set(key.storage_key(), result.clone(), ttl).await;
            tracing::debug!(
                "Cached result for tool '{}' on '{}' (ttl {:?})",
                invocation.tool,
                server,
                ttl
            );
        }

        Ok(result)
    }

    /// Clear every pair cache whose `tool:server` key contains the pattern
    ///
    /// Coarse-grained and idempotent; returns how many caches were cleared.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let caches = self.caches.read().await;
        let mut cleared = 0;

        for (key, cache) in caches.iter() {
            if key.contains(pattern) {
                cache.clear().await;
                cleared += 1;
            }
        }

        if cleared > 0 {
            tracing::info!("Invalidated {} caches matching '{}'", cleared, pattern);
        }
        cleared
    }

    /// Aggregate statistics across all pair caches
    ///
    /// `hit_rate` is hits / (hits + misses), or 0 when nothing has been
    /// looked up yet.
    pub async fn global_stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        let mut stats = CacheStats {
            hits,
            misses,
            ..CacheStats::default()
        };

        let caches = self.caches.read().await;
        for cache in caches.values() {
            let store = cache.stats().await;
            stats.total_keys += store.total_keys;
            stats.total_size_bytes += store.total_size_bytes;
            stats.evictions += store.evictions;
        }

        if hits + misses > 0 {
            stats.hit_rate = hits as f64 / (hits + misses) as f64;
        }

        stats
    }

    /// Sweep expired entries out of every pair cache
    pub async fn cleanup_all(&self) -> usize {
        let caches = self.caches.read().await;
        let mut removed = 0;
        for cache in caches.values() {
            removed += cache.cleanup().await;
        }
        removed
    }

    /// Spawn the periodic cleanup task
    pub fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = manager.config.cleanup_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = manager.cleanup_all().await;
                if removed > 0 {
                    tracing::debug!("Cache cleanup removed {} expired entries", removed);
                }
            }
        })
    }

    /// Clear and release all pair caches; safe to call more than once
    pub async fn shutdown(&self) {
        let mut caches = self.caches.write().await;
        for cache in caches.values() {
            cache.clear().await;
        }
        caches.clear();
        tracing::info!("Cache manager shut down");
    }
}
