use crate::logic::aggregate::{FillSide, LendingUserTrade, UserTrade};
use crate::logic::classifier::TradeClassifier;
use crate::logic::table::{AggregateTable, LendingKey, RelayerUserKey, UserKey};
use crate::pair::PairKey;
use crate::trade::{LendingTrade, Trade};
use crate::utils::time;
use ahash::AHashMap;
use alloy_primitives::{Address, U256};

/// In-memory multi-dimensional index of spot trade aggregates.
///
/// Owns no lock: the service wraps one instance in a `tokio::sync::RwLock`,
/// takes the exclusive mode for `apply_trade`/`absorb_*` and the shared mode
/// for the query methods in `logic::query`. Keeping the structure lock-free
/// keeps the update algorithm and the queries unit-testable on their own.
#[derive(Clone, Debug)]
pub struct TradeCache {
    last_time: i64,
    user_trades: AggregateTable<UserKey, UserTrade>,
    relayer_user_trades: AggregateTable<RelayerUserKey, UserTrade>,
    last_pair_price: AHashMap<PairKey, U256>,
    classifier: TradeClassifier,
}

impl TradeCache {
    pub fn new(classifier: TradeClassifier) -> TradeCache {
        TradeCache {
            last_time: 0,
            user_trades: AggregateTable::new(),
            relayer_user_trades: AggregateTable::new(),
            last_pair_price: AHashMap::new(),
            classifier,
        }
    }

    /// High-water mark: timestamp of the most recent trade applied.
    pub fn last_time(&self) -> i64 {
        self.last_time
    }

    pub fn set_last_time(&mut self, last_time: i64) {
        self.last_time = last_time;
    }

    pub fn classifier(&self) -> &TradeClassifier {
        &self.classifier
    }

    pub fn last_pair_price(&self, pair: &PairKey) -> Option<U256> {
        self.last_pair_price.get(pair).copied()
    }

    pub fn user_trades(&self) -> impl Iterator<Item = (&UserKey, &UserTrade)> {
        self.user_trades.iter()
    }

    pub fn relayer_user_trades(&self) -> impl Iterator<Item = (&RelayerUserKey, &UserTrade)> {
        self.relayer_user_trades.iter()
    }

    /// The (address, split) updates a trade produces. A self-match collapses
    /// to a single entry moving both splits at once.
    fn fill_sides(trade: &Trade) -> Vec<(Address, FillSide)> {
        if trade.is_self_match() {
            vec![(trade.taker, FillSide::Both)]
        } else {
            vec![
                (trade.taker, FillSide::taker(trade.taker_side)),
                (trade.maker, FillSide::maker(trade.taker_side)),
            ]
        }
    }

    /// Apply one executed trade to every view it touches.
    ///
    /// `volume_by_quote` is the pre-computed quote-equivalent volume (zero
    /// when token metadata was unavailable). The global per-pair view always
    /// updates; the relayer-scoped view is skipped for wash trades so
    /// relayer rankings stay clean while raw pair statistics keep counting.
    pub fn apply_trade(&mut self, trade: &Trade, volume_by_quote: U256) {
        let pair = trade.pair();
        let bucket = time::bucket_start(trade.created_at);
        self.last_pair_price.insert(pair, trade.price_point);

        for (user, side) in Self::fill_sides(trade) {
            let key = UserKey::new(pair, user, bucket);
            self.user_trades
                .entry_or_insert_with(key, || UserTrade::new(user, Address::ZERO, pair, bucket))
                .record_fill(side, trade.amount, volume_by_quote);
        }

        if !self.classifier.is_wash_trade(trade.maker, trade.taker) {
            for relayer in trade.relayers() {
                for (user, side) in Self::fill_sides(trade) {
                    let key = RelayerUserKey::new(relayer, pair, user, bucket);
                    self.relayer_user_trades
                        .entry_or_insert_with(key, || UserTrade::new(user, relayer, pair, bucket))
                        .record_fill(side, trade.amount, volume_by_quote);
                }
            }
        }

        if trade.created_at > self.last_time {
            self.last_time = trade.created_at;
        }
    }

    /// Re-insert a flattened global aggregate, rebuilding its key from the
    /// record's own fields. Used by snapshot reload.
    pub fn absorb_user_trade(&mut self, record: UserTrade) {
        let key = UserKey::new(record.pair(), record.user, record.timestamp);
        self.user_trades.insert(key, record);
    }

    /// Re-insert a flattened relayer-scoped aggregate.
    pub fn absorb_relayer_user_trade(&mut self, record: UserTrade) {
        let key = RelayerUserKey::new(record.relayer, record.pair(), record.user, record.timestamp);
        self.relayer_user_trades.insert(key, record);
    }
}

/// Lending counterpart of `TradeCache`: a strict subset keyed
/// (relayer, user, bucket) that only aggregates participation counts.
#[derive(Clone, Debug, Default)]
pub struct LendingTradeCache {
    last_time: i64,
    relayer_user_trades: AggregateTable<LendingKey, LendingUserTrade>,
}

impl LendingTradeCache {
    pub fn new() -> LendingTradeCache {
        LendingTradeCache::default()
    }

    pub fn last_time(&self) -> i64 {
        self.last_time
    }

    pub fn set_last_time(&mut self, last_time: i64) {
        self.last_time = last_time;
    }

    pub fn relayer_user_trades(&self) -> impl Iterator<Item = (&LendingKey, &LendingUserTrade)> {
        self.relayer_user_trades.iter()
    }

    pub fn apply_trade(&mut self, trade: &LendingTrade) {
        let bucket = time::bucket_start(trade.created_at);
        for (relayer, user) in trade.sides() {
            let key = LendingKey::new(relayer, user, bucket);
            self.relayer_user_trades
                .entry_or_insert_with(key, || LendingUserTrade::new(user, relayer, bucket))
                .record_trade();
        }
        if trade.created_at > self.last_time {
            self.last_time = trade.created_at;
        }
    }

    pub fn absorb_relayer_user_trade(&mut self, record: LendingUserTrade) {
        let key = LendingKey::new(record.relayer, record.user, record.timestamp);
        self.relayer_user_trades.insert(key, record);
    }

    /// Distinct users that traded under `relayer` within [from, to]
    /// (zero bounds are open-ended).
    pub fn number_traders_by_time(&self, relayer: Address, from: i64, to: i64) -> usize {
        let mut users = ahash::AHashSet::new();
        for (key, _) in self.relayer_user_trades.iter() {
            if key.relayer == relayer && time::in_range(key.bucket, from, to) {
                users.insert(key.user);
            }
        }
        users.len()
    }
}
