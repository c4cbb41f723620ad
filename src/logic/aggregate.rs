use crate::pair::PairKey;
use crate::trade::TradeSide;
use alloy_primitives::{Address, U256};

/// Which of a record's volume splits a fill lands on.
///
/// `Both` models a self-match: a fill against the user's own resting order
/// counts once but moves the ask and bid splits together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillSide {
    Ask,
    Bid,
    Both,
}

impl FillSide {
    /// Split credited to the taker: a buying taker accumulates bid volume.
    pub fn taker(side: TradeSide) -> FillSide {
        match side {
            TradeSide::Buy => FillSide::Bid,
            TradeSide::Sell => FillSide::Ask,
        }
    }

    /// Split credited to the maker: the complement of the taker's.
    pub fn maker(side: TradeSide) -> FillSide {
        match side {
            TradeSide::Buy => FillSide::Ask,
            TradeSide::Sell => FillSide::Bid,
        }
    }
}

/// Accumulator for one (user, bucket) cell of a trade view.
///
/// Volumes only ever grow for a fixed key; records are created lazily on the
/// first fill that touches them and live until process exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserTrade {
    pub user: Address,
    /// Zero for the global per-pair view.
    pub relayer: Address,
    pub base_token: Address,
    pub quote_token: Address,
    /// Start of the hour bucket this record accumulates.
    pub timestamp: i64,
    pub count: u64,
    pub volume: U256,
    pub volume_by_quote: U256,
    pub volume_ask: U256,
    pub volume_bid: U256,
    pub volume_ask_by_quote: U256,
    pub volume_bid_by_quote: U256,
}

impl UserTrade {
    pub fn new(user: Address, relayer: Address, pair: PairKey, timestamp: i64) -> UserTrade {
        UserTrade {
            user,
            relayer,
            base_token: pair.base,
            quote_token: pair.quote,
            timestamp,
            count: 0,
            volume: U256::ZERO,
            volume_by_quote: U256::ZERO,
            volume_ask: U256::ZERO,
            volume_bid: U256::ZERO,
            volume_ask_by_quote: U256::ZERO,
            volume_bid_by_quote: U256::ZERO,
        }
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(self.base_token, self.quote_token)
    }

    /// Accumulate one fill of `amount` base units worth `quote` quote units
    /// on the given side.
    pub fn record_fill(&mut self, side: FillSide, amount: U256, quote: U256) {
        self.count += 1;
        self.volume += amount;
        self.volume_by_quote += quote;
        match side {
            FillSide::Ask => {
                self.volume_ask += amount;
                self.volume_ask_by_quote += quote;
            }
            FillSide::Bid => {
                self.volume_bid += amount;
                self.volume_bid_by_quote += quote;
            }
            FillSide::Both => {
                self.volume_ask += amount;
                self.volume_bid += amount;
                self.volume_ask_by_quote += quote;
                self.volume_bid_by_quote += quote;
            }
        }
    }
}

/// Accumulator for one (relayer, user, bucket) cell of the lending view.
/// Tracks participation counts only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LendingUserTrade {
    pub user: Address,
    pub relayer: Address,
    pub timestamp: i64,
    pub count: u64,
}

impl LendingUserTrade {
    pub fn new(user: Address, relayer: Address, timestamp: i64) -> LendingUserTrade {
        LendingUserTrade { user, relayer, timestamp, count: 0 }
    }

    pub fn record_trade(&mut self) {
        self.count += 1;
    }
}
