use alloy_primitives::Address;

/// Aggregation bucket width. One hour is the finest granularity the cache
/// tracks.
pub const BUCKET_SECS: i64 = 60 * 60;

/// How far back historical backfill reaches when no snapshot exists.
pub const BACKFILL_WINDOW_SECS: i64 = 60 * 24 * 60 * 60;

/// Lifetime of a cached token metadata entry.
pub const TOKEN_CACHE_TTL_SECS: u64 = 15 * 50;

pub const SNAPSHOT_INTERVAL_SECS: u64 = 60;

pub const TRADE_SNAPSHOT_FILE: &str = "trade.cache";
pub const LENDING_SNAPSHOT_FILE: &str = "lending.trade.cache";

/// Number of ranking entries returned when the caller does not ask for a
/// specific top-N.
pub const DEFAULT_TOP: usize = 10;

/// The zero address acts as the "all relayers" / "any user" wildcard in
/// query parameters.
pub const ANY_ADDRESS: Address = Address::ZERO;
