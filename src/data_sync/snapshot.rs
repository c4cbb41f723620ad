use crate::logic::aggregate::{LendingUserTrade, UserTrade};
use crate::logic::cache::{LendingTradeCache, TradeCache};
use crate::logic::types::decimal;
use alloy_primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Errors produced while flushing a snapshot. Load-side problems are not
/// errors at all: persistence is best-effort and backfill can rebuild
/// everything from the record store.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Flattened aggregate record as persisted on disk. Monetary fields are
/// decimal strings; the key fields are carried inline so the nested cache
/// can be rebuilt from the flat list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTradeRecord {
    pub user_address: Address,
    pub relayer_address: Address,
    pub base_token: Address,
    pub quote_token: Address,
    pub time_stamp: i64,
    pub count: u64,
    #[serde(with = "decimal")]
    pub volume: U256,
    #[serde(with = "decimal")]
    pub volume_by_quote: U256,
    #[serde(with = "decimal")]
    pub volume_ask: U256,
    #[serde(with = "decimal")]
    pub volume_bid: U256,
    #[serde(with = "decimal")]
    pub volume_ask_by_quote: U256,
    #[serde(with = "decimal")]
    pub volume_bid_by_quote: U256,
}

impl From<&UserTrade> for UserTradeRecord {
    fn from(t: &UserTrade) -> UserTradeRecord {
        UserTradeRecord {
            user_address: t.user,
            relayer_address: t.relayer,
            base_token: t.base_token,
            quote_token: t.quote_token,
            time_stamp: t.timestamp,
            count: t.count,
            volume: t.volume,
            volume_by_quote: t.volume_by_quote,
            volume_ask: t.volume_ask,
            volume_bid: t.volume_bid,
            volume_ask_by_quote: t.volume_ask_by_quote,
            volume_bid_by_quote: t.volume_bid_by_quote,
        }
    }
}

impl From<UserTradeRecord> for UserTrade {
    fn from(r: UserTradeRecord) -> UserTrade {
        UserTrade {
            user: r.user_address,
            relayer: r.relayer_address,
            base_token: r.base_token,
            quote_token: r.quote_token,
            timestamp: r.time_stamp,
            count: r.count,
            volume: r.volume,
            volume_by_quote: r.volume_by_quote,
            volume_ask: r.volume_ask,
            volume_bid: r.volume_bid,
            volume_ask_by_quote: r.volume_ask_by_quote,
            volume_bid_by_quote: r.volume_bid_by_quote,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingUserTradeRecord {
    pub user_address: Address,
    pub relayer_address: Address,
    pub time_stamp: i64,
    pub count: u64,
}

impl From<&LendingUserTrade> for LendingUserTradeRecord {
    fn from(t: &LendingUserTrade) -> LendingUserTradeRecord {
        LendingUserTradeRecord {
            user_address: t.user,
            relayer_address: t.relayer,
            time_stamp: t.timestamp,
            count: t.count,
        }
    }
}

impl From<LendingUserTradeRecord> for LendingUserTrade {
    fn from(r: LendingUserTradeRecord) -> LendingUserTrade {
        LendingUserTrade {
            user: r.user_address,
            relayer: r.relayer_address,
            timestamp: r.time_stamp,
            count: r.count,
        }
    }
}

/// On-disk shape of the spot trade cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSnapshot {
    pub last_time: i64,
    pub user_trades: Vec<UserTradeRecord>,
    pub relayer_user_trades: Vec<UserTradeRecord>,
}

impl TradeSnapshot {
    /// Flatten the nested cache. Called with the shared lock held; the
    /// expensive serialization happens on the returned value afterwards.
    pub fn from_cache(cache: &TradeCache) -> TradeSnapshot {
        TradeSnapshot {
            last_time: cache.last_time(),
            user_trades: cache.user_trades().map(|(_, t)| t.into()).collect(),
            relayer_user_trades: cache.relayer_user_trades().map(|(_, t)| t.into()).collect(),
        }
    }

    /// Rebuild the nested cache from the flat record lists.
    pub fn restore(self, cache: &mut TradeCache) {
        for record in self.user_trades {
            cache.absorb_user_trade(record.into());
        }
        for record in self.relayer_user_trades {
            cache.absorb_relayer_user_trade(record.into());
        }
        cache.set_last_time(self.last_time);
    }
}

/// On-disk shape of the lending trade cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingSnapshot {
    pub last_time: i64,
    pub relayer_user_trades: Vec<LendingUserTradeRecord>,
}

impl LendingSnapshot {
    pub fn from_cache(cache: &LendingTradeCache) -> LendingSnapshot {
        LendingSnapshot {
            last_time: cache.last_time(),
            relayer_user_trades: cache.relayer_user_trades().map(|(_, t)| t.into()).collect(),
        }
    }

    pub fn restore(self, cache: &mut LendingTradeCache) {
        for record in self.relayer_user_trades {
            cache.absorb_relayer_user_trade(record.into());
        }
        cache.set_last_time(self.last_time);
    }
}

/// Read a snapshot file. Absent or malformed files yield `None`: the cache
/// starts empty and historical backfill rebuilds the state.
pub async fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), %err, "snapshot unreadable, starting empty");
            return None;
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            warn!(path = %path.display(), %err, "snapshot malformed, starting empty");
            None
        }
    }
}

/// Serialize a snapshot and atomically replace the target file, so a crash
/// mid-write never leaves a truncated snapshot behind.
pub async fn flush<T: Serialize>(path: &Path, snapshot: &T) -> Result<(), SnapshotError> {
    let data = serde_json::to_vec(snapshot)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::classifier::TradeClassifier;
    use crate::pair::PairKey;
    use crate::trade::{Trade, TradeSide};

    fn populated_cache() -> TradeCache {
        let mut cache = TradeCache::new(TradeClassifier::default());
        let trade = Trade {
            maker: Address::repeat_byte(0x01),
            taker: Address::repeat_byte(0x02),
            maker_exchange: Address::repeat_byte(0xa1),
            taker_exchange: Address::repeat_byte(0xa2),
            base_token: Address::repeat_byte(0x10),
            quote_token: Address::repeat_byte(0x20),
            amount: U256::from(100u64),
            price_point: U256::from(2u64),
            taker_side: TradeSide::Buy,
            created_at: 7200,
        };
        cache.apply_trade(&trade, U256::from(200u64));
        cache
    }

    #[test]
    fn test_flatten_restore_round_trip() {
        let cache = populated_cache();
        let snapshot = TradeSnapshot::from_cache(&cache);

        let mut restored = TradeCache::new(TradeClassifier::default());
        snapshot.restore(&mut restored);

        assert_eq!(restored.last_time(), cache.last_time());
        let original: Vec<_> = cache.user_trades().collect();
        for (_, record) in original {
            let key = crate::logic::table::UserKey::new(
                PairKey::new(record.base_token, record.quote_token),
                record.user,
                record.timestamp,
            );
            let restored_record = restored
                .user_trades()
                .find(|(k, _)| **k == key)
                .map(|(_, r)| r)
                .expect("record missing after restore");
            assert_eq!(restored_record, record);
        }
        assert_eq!(
            restored.relayer_user_trades().count(),
            cache.relayer_user_trades().count()
        );
    }

    #[test]
    fn test_snapshot_serializes_decimal_strings() {
        let cache = populated_cache();
        let snapshot = TradeSnapshot::from_cache(&cache);
        let json = serde_json::to_string(&snapshot).unwrap();

        assert!(json.contains("\"lastTime\":7200"));
        assert!(json.contains("\"volume\":\"100\""));
        assert!(!json.contains("0x64"));

        let back: TradeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade.cache");
        assert!(load::<TradeSnapshot>(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade.cache");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(load::<TradeSnapshot>(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_flush_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade.cache");
        tokio::fs::write(&path, b"stale garbage").await.unwrap();

        let cache = populated_cache();
        let snapshot = TradeSnapshot::from_cache(&cache);
        flush(&path, &snapshot).await.unwrap();

        let loaded: TradeSnapshot = load(&path).await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_lending_snapshot_round_trip() {
        let mut cache = LendingTradeCache::new();
        let trade = crate::trade::LendingTrade {
            investor: Address::repeat_byte(0x01),
            borrower: Address::repeat_byte(0x02),
            investing_relayer: Address::repeat_byte(0xa1),
            borrowing_relayer: Address::repeat_byte(0xa2),
            term: 86400,
            lending_token: Address::repeat_byte(0x10),
            amount: U256::from(100u64),
            created_at: 7200,
        };
        cache.apply_trade(&trade);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lending.trade.cache");
        flush(&path, &LendingSnapshot::from_cache(&cache)).await.unwrap();

        let mut restored = LendingTradeCache::new();
        load::<LendingSnapshot>(&path).await.unwrap().restore(&mut restored);

        assert_eq!(restored.last_time(), 7200);
        assert_eq!(restored.number_traders_by_time(Address::repeat_byte(0xa1), 0, 0), 1);
        assert_eq!(restored.number_traders_by_time(Address::repeat_byte(0xa2), 0, 0), 1);
    }
}
