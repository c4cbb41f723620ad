use crate::constants::TOKEN_CACHE_TTL_SECS;
use crate::token::Token;
use alloy_primitives::Address;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Cache entry with its insertion time and lifetime.
#[derive(Clone, Debug)]
pub struct CacheItem<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl<T> CacheItem<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: std::sync::atomic::AtomicU64,
    pub misses: std::sync::atomic::AtomicU64,
    pub evictions: std::sync::atomic::AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(std::sync::atomic::Ordering::Relaxed);
        let misses = self.misses.load(std::sync::atomic::Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// TTL cache for token metadata.
///
/// Lives outside the aggregation cache's lock: lookups happen before the
/// write lock is taken, so a slow metadata source never stalls ingestion.
#[derive(Debug)]
pub struct TokenTtlCache {
    tokens: DashMap<Address, CacheItem<Token>>,
    pub stats: CacheStats,
    ttl: Duration,
}

impl TokenTtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            stats: CacheStats::default(),
            ttl,
        }
    }

    pub fn new_default() -> Self {
        Self::new(Duration::from_secs(TOKEN_CACHE_TTL_SECS))
    }

    pub fn get(&self, address: Address) -> Option<Token> {
        if let Some(item) = self.tokens.get(&address) {
            if !item.is_expired() {
                self.stats.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return Some(item.data.clone());
            }
            drop(item);
            self.tokens.remove(&address);
            self.stats.evictions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        None
    }

    pub fn insert(&self, token: Token) {
        let item = CacheItem::new(token.clone(), self.ttl);
        self.tokens.insert(token.get_address(), item);
    }

    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.tokens.retain(|_, item| {
            let expired = now.duration_since(item.timestamp) > item.ttl;
            if expired {
                self.stats.evictions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            !expired
        });
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&self) {
        self.tokens.clear();
    }
}
