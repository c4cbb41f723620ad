pub mod aggregate;
pub mod cache;
pub mod classifier;
pub mod query;
pub mod table;
pub mod types;

pub use aggregate::{FillSide, LendingUserTrade, UserTrade};
pub use cache::{LendingTradeCache, TradeCache};
pub use classifier::TradeClassifier;
pub use table::{AggregateTable, LendingKey, RelayerUserKey, UserKey};
pub use types::{TradeVolume, UserPnL, UserVolume};
