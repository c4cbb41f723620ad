// Two-Layer Architecture
pub mod data_sync; // Data Layer: record store seams, ingestion, snapshots
pub mod logic; // Logic Layer: aggregation cache, classifier, queries

// Common types and utilities
pub mod constants;
pub mod pair;
pub mod token;
pub mod trade;
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{
    CachedTokenStore, LendingStatsService, LendingTradeStore, MemoryLendingTradeStore, MemoryTokenStore,
    MemoryTradeStore, StatsConfig, StoreError, TokenStore, TradeStatsService, TradeStatsServiceBuilder, TradeStore,
};
pub use logic::{
    LendingTradeCache, LendingUserTrade, TradeCache, TradeClassifier, TradeVolume, UserPnL, UserTrade, UserVolume,
};
pub use pair::PairKey;
pub use token::Token;
pub use trade::{LendingTrade, Trade, TradeSide};
