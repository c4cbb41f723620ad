use crate::data_sync::store::{
    LendingTradeStore, LendingTradeSubscription, StoreError, TokenStore, TradeStore, TradeSubscription,
};
use crate::token::Token;
use crate::trade::{ChangeOperation, LendingTrade, LendingTradeChangeEvent, Trade, TradeChangeEvent};
use ahash::AHashMap;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

// In-memory record store used by tests and benchmarks.

/// Collects up to `batch_size` events from `rx`, waiting `max_await` for the
/// first one. Empty batch on timeout, error when all senders are gone.
async fn drain_batch<E>(
    rx: &mut mpsc::UnboundedReceiver<E>,
    max_await: Duration,
    batch_size: usize,
) -> Result<Vec<E>, StoreError> {
    let mut events = Vec::new();
    match timeout(max_await, rx.recv()).await {
        Ok(Some(event)) => events.push(event),
        Ok(None) => return Err(StoreError::FeedClosed),
        Err(_) => return Ok(events),
    }
    while events.len() < batch_size {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(_) => break,
        }
    }
    Ok(events)
}

#[derive(Default)]
pub struct MemoryTradeStore {
    trades: Mutex<Vec<Trade>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TradeChangeEvent>>>,
}

impl MemoryTradeStore {
    pub fn new() -> MemoryTradeStore {
        MemoryTradeStore::default()
    }

    /// Store a trade and publish it to every open subscription.
    pub fn insert(&self, trade: Trade) {
        self.trades.lock().expect("trade store poisoned").push(trade.clone());
        let event = TradeChangeEvent { operation_type: ChangeOperation::Insert, full_document: trade };
        self.subscribers
            .lock()
            .expect("trade store poisoned")
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.trades.lock().expect("trade store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn trades_by_time(&self, from: i64, to: i64, offset: usize, limit: usize) -> Result<Vec<Trade>, StoreError> {
        let mut matching: Vec<Trade> = self
            .trades
            .lock()
            .expect("trade store poisoned")
            .iter()
            .filter(|t| t.created_at >= from && t.created_at < to)
            .cloned()
            .collect();
        matching.sort_by_key(|t| t.created_at);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn subscribe(&self, max_await: Duration, batch_size: usize)
    -> Result<Box<dyn TradeSubscription>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("trade store poisoned").push(tx);
        Ok(Box::new(MemoryTradeSubscription { rx, max_await, batch_size }))
    }
}

pub struct MemoryTradeSubscription {
    rx: mpsc::UnboundedReceiver<TradeChangeEvent>,
    max_await: Duration,
    batch_size: usize,
}

#[async_trait]
impl TradeSubscription for MemoryTradeSubscription {
    async fn next_batch(&mut self) -> Result<Vec<TradeChangeEvent>, StoreError> {
        drain_batch(&mut self.rx, self.max_await, self.batch_size).await
    }
}

#[derive(Default)]
pub struct MemoryLendingTradeStore {
    trades: Mutex<Vec<LendingTrade>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<LendingTradeChangeEvent>>>,
}

impl MemoryLendingTradeStore {
    pub fn new() -> MemoryLendingTradeStore {
        MemoryLendingTradeStore::default()
    }

    pub fn insert(&self, trade: LendingTrade) {
        self.trades.lock().expect("lending store poisoned").push(trade.clone());
        let event = LendingTradeChangeEvent { operation_type: ChangeOperation::Insert, full_document: trade };
        self.subscribers
            .lock()
            .expect("lending store poisoned")
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl LendingTradeStore for MemoryLendingTradeStore {
    async fn trades_by_time(&self, from: i64, to: i64, offset: usize, limit: usize)
    -> Result<Vec<LendingTrade>, StoreError> {
        let mut matching: Vec<LendingTrade> = self
            .trades
            .lock()
            .expect("lending store poisoned")
            .iter()
            .filter(|t| t.created_at >= from && t.created_at < to)
            .cloned()
            .collect();
        matching.sort_by_key(|t| t.created_at);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn subscribe(&self, max_await: Duration, batch_size: usize)
    -> Result<Box<dyn LendingTradeSubscription>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("lending store poisoned").push(tx);
        Ok(Box::new(MemoryLendingTradeSubscription { rx, max_await, batch_size }))
    }
}

pub struct MemoryLendingTradeSubscription {
    rx: mpsc::UnboundedReceiver<LendingTradeChangeEvent>,
    max_await: Duration,
    batch_size: usize,
}

#[async_trait]
impl LendingTradeSubscription for MemoryLendingTradeSubscription {
    async fn next_batch(&mut self) -> Result<Vec<LendingTradeChangeEvent>, StoreError> {
        drain_batch(&mut self.rx, self.max_await, self.batch_size).await
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<AHashMap<Address, Token>>,
    fail_lookups: std::sync::atomic::AtomicBool,
}

impl MemoryTokenStore {
    pub fn new() -> MemoryTokenStore {
        MemoryTokenStore::default()
    }

    pub fn insert(&self, token: Token) {
        self.tokens.lock().expect("token store poisoned").insert(token.get_address(), token);
    }

    /// Make subsequent lookups fail, to exercise degradation paths.
    pub fn set_failing(&self, failing: bool) {
        self.fail_lookups.store(failing, std::sync::atomic::Ordering::Relaxed);
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn token_by_address(&self, address: Address) -> Result<Option<Token>, StoreError> {
        if self.fail_lookups.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(StoreError::Unavailable("lookup disabled".to_string()));
        }
        Ok(self.tokens.lock().expect("token store poisoned").get(&address).cloned())
    }
}
