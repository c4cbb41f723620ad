use crate::token::Token;
use crate::trade::{LendingTrade, LendingTradeChangeEvent, Trade, TradeChangeEvent};
use crate::utils::token_cache::{CacheStats, TokenTtlCache};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Errors surfaced by the external historical-record store and its feeds.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("change feed closed")]
    FeedClosed,
}

/// Paginated, time-ordered source of executed spot trades plus a live
/// change feed over the same collection.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Trades with `from <= created_at < to`, ascending by creation time,
    /// paged by offset/limit.
    async fn trades_by_time(&self, from: i64, to: i64, offset: usize, limit: usize) -> Result<Vec<Trade>, StoreError>;

    /// Open a live subscription to the trade collection. `max_await` bounds
    /// each poll, `batch_size` bounds each delivery.
    async fn subscribe(&self, max_await: Duration, batch_size: usize)
    -> Result<Box<dyn TradeSubscription>, StoreError>;
}

/// One open change-feed subscription.
#[async_trait]
pub trait TradeSubscription: Send {
    /// Next batch of change events. Returns an empty batch when `max_await`
    /// elapses without traffic; an error terminates the subscription.
    async fn next_batch(&mut self) -> Result<Vec<TradeChangeEvent>, StoreError>;
}

/// Lending-side counterpart of [`TradeStore`].
#[async_trait]
pub trait LendingTradeStore: Send + Sync {
    async fn trades_by_time(&self, from: i64, to: i64, offset: usize, limit: usize)
    -> Result<Vec<LendingTrade>, StoreError>;

    async fn subscribe(&self, max_await: Duration, batch_size: usize)
    -> Result<Box<dyn LendingTradeSubscription>, StoreError>;
}

#[async_trait]
pub trait LendingTradeSubscription: Send {
    async fn next_batch(&mut self) -> Result<Vec<LendingTradeChangeEvent>, StoreError>;
}

/// Fallible token metadata lookup.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn token_by_address(&self, address: Address) -> Result<Option<Token>, StoreError>;
}

/// Token store front-end with its own TTL cache.
///
/// Independent of the aggregation cache's lock: metadata is resolved before
/// the write lock is taken, and a lookup failure degrades the affected
/// volume computation to zero instead of propagating.
pub struct CachedTokenStore {
    store: Arc<dyn TokenStore>,
    cache: TokenTtlCache,
}

impl CachedTokenStore {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> CachedTokenStore {
        CachedTokenStore { store, cache: TokenTtlCache::new(ttl) }
    }

    pub async fn token(&self, address: Address) -> Option<Token> {
        if let Some(token) = self.cache.get(address) {
            return Some(token);
        }
        match self.store.token_by_address(address).await {
            Ok(Some(token)) => {
                self.cache.insert(token.clone());
                Some(token)
            }
            Ok(None) => None,
            Err(err) => {
                debug!(%address, %err, "token metadata lookup failed");
                None
            }
        }
    }

    /// Quote-equivalent volume of a trade, zero when metadata is missing.
    pub async fn quote_value(&self, trade: &Trade) -> U256 {
        match self.token(trade.base_token).await {
            Some(token) => token.quote_value(trade.amount, trade.price_point),
            None => U256::ZERO,
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.cache.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::memory_store::MemoryTokenStore;

    #[tokio::test]
    async fn test_cached_token_store_caches_hits() {
        let source = Arc::new(MemoryTokenStore::new());
        let token = Token::new_with_data(Address::repeat_byte(0x10), Some("TST".to_string()), Some(0));
        source.insert(token.clone());

        let cached = CachedTokenStore::new(source, Duration::from_secs(60));
        assert!(cached.token(token.get_address()).await.is_some());
        assert!(cached.token(token.get_address()).await.is_some());
        assert_eq!(cached.stats().hits.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_quote_value_degrades_to_zero_without_metadata() {
        let source = Arc::new(MemoryTokenStore::new());
        let cached = CachedTokenStore::new(source, Duration::from_secs(60));

        let trade = Trade {
            maker: Address::repeat_byte(0x01),
            taker: Address::repeat_byte(0x02),
            maker_exchange: Address::repeat_byte(0xa1),
            taker_exchange: Address::repeat_byte(0xa1),
            base_token: Address::repeat_byte(0x10),
            quote_token: Address::repeat_byte(0x20),
            amount: U256::from(100u64),
            price_point: U256::from(2u64),
            taker_side: crate::trade::TradeSide::Buy,
            created_at: 3600,
        };
        assert_eq!(cached.quote_value(&trade).await, U256::ZERO);
    }
}
