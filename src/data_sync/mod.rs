/// Data Layer
///
/// Owns everything between the external record store and the in-memory
/// aggregation cache:
///
/// - trait seams for the historical store, its change feeds and token
///   metadata, plus an in-memory implementation for tests and benches
/// - the live ingestion watcher with supervised resubscription
/// - the snapshot file format with atomic replace and best-effort reload
/// - the two engine services wiring bootstrap, backfill and timers together

// Core data layer components
pub mod config;
pub mod lending_service;
pub mod memory_store;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod watcher;

// Tests
#[cfg(test)]
mod tests;

// Re-export main components for easy usage
pub use config::StatsConfig;
pub use lending_service::LendingStatsService;
pub use memory_store::{MemoryLendingTradeStore, MemoryTokenStore, MemoryTradeStore};
pub use service::{TradeStatsService, TradeStatsServiceBuilder};
pub use snapshot::{LendingSnapshot, LendingUserTradeRecord, SnapshotError, TradeSnapshot, UserTradeRecord};
pub use store::{
    CachedTokenStore, LendingTradeStore, LendingTradeSubscription, StoreError, TokenStore, TradeStore,
    TradeSubscription,
};
pub use watcher::WatcherSettings;
