use crate::constants::{ANY_ADDRESS, DEFAULT_TOP};
use crate::logic::cache::TradeCache;
use crate::logic::types::{TradeVolume, UserPnL, UserVolume};
use crate::pair::PairKey;
use crate::token::quote_value;
use crate::utils::time;
use ahash::{AHashMap, AHashSet};
use alloy_primitives::{Address, I256, U256};

fn effective_top(top: usize, len: usize) -> usize {
    let top = if top == 0 { DEFAULT_TOP } else { top };
    top.min(len)
}

fn signed(value: U256) -> I256 {
    I256::try_from(value).unwrap_or(I256::MAX)
}

#[derive(Default)]
struct SideSums {
    ask: U256,
    bid: U256,
    ask_by_quote: U256,
    bid_by_quote: U256,
}

/// Read-side algorithms over the relayer-scoped aggregates.
///
/// Callers hold the shared lock for the duration of one method call; that is
/// the consistency unit. A concurrent writer may land between two calls.
impl TradeCache {
    /// Per-user quote volume ranking.
    ///
    /// `relayer` zero widens to all relayers, an empty `base_tokens` list is
    /// a wildcard, zero time bounds are open-ended. Bot addresses are
    /// excluded before ranking; `user_address` then narrows the ranked list
    /// without disturbing rank numbers. `top` zero means the default of 10.
    pub fn query_volume(
        &self,
        relayer: Address,
        user_address: Address,
        base_tokens: &[Address],
        quote_token: Address,
        from: i64,
        to: i64,
        top: usize,
    ) -> Vec<UserVolume> {
        let mut volumes: AHashMap<Address, U256> = AHashMap::new();
        for (key, record) in self.relayer_user_trades() {
            if relayer != ANY_ADDRESS && key.relayer != relayer {
                continue;
            }
            if !key.pair.matches(base_tokens, quote_token) {
                continue;
            }
            if !time::in_range(key.bucket, from, to) {
                continue;
            }
            *volumes.entry(key.user).or_insert(U256::ZERO) += record.volume_by_quote;
        }

        let mut users: Vec<UserVolume> = volumes
            .into_iter()
            .filter(|(user, _)| !self.classifier().is_bot(*user))
            .map(|(user, volume)| UserVolume { user_address: user, volume, rank: 0 })
            .collect();
        users.sort_by(|a, b| b.volume.cmp(&a.volume));

        let mut ranked = Vec::new();
        for (i, user) in users.into_iter().enumerate() {
            if user_address == ANY_ADDRESS || user.user_address == user_address {
                ranked.push(UserVolume { rank: i + 1, ..user });
            }
        }
        let top = effective_top(top, ranked.len());
        ranked.truncate(top);
        ranked
    }

    /// Ranking over the trailing 24 hours, aligned down to the bucket that
    /// was current a day ago.
    pub fn query_24h_volume(
        &self,
        relayer: Address,
        user_address: Address,
        base_tokens: &[Address],
        quote_token: Address,
        top: usize,
    ) -> Vec<UserVolume> {
        let now = time::unix_now();
        self.query_volume(relayer, user_address, base_tokens, quote_token, time::day_ago_bucket(now), now, top)
    }

    /// Summed quote volume plus the number of matching (relayer, pair, user)
    /// aggregate groups. The time range gates the volume sum only; the group
    /// count is range-independent.
    pub fn query_total(
        &self,
        relayer: Address,
        base_tokens: &[Address],
        quote_token: Address,
        from: i64,
        to: i64,
    ) -> TradeVolume {
        let mut total = U256::ZERO;
        let mut groups: AHashSet<(Address, PairKey, Address)> = AHashSet::new();
        for (key, record) in self.relayer_user_trades() {
            if relayer != ANY_ADDRESS && key.relayer != relayer {
                continue;
            }
            if !key.pair.matches(base_tokens, quote_token) {
                continue;
            }
            groups.insert((key.relayer, key.pair, key.user));
            if time::in_range(key.bucket, from, to) {
                total += record.volume_by_quote;
            }
        }
        TradeVolume { total_volume: total, trader: groups.len() as u64 }
    }

    /// Top users by estimated PnL on one exact (relayer, pair) scope.
    ///
    /// Long inventory (bid >= ask) is valued at the last observed price for
    /// the pair; without an observed price the estimate stays at zero. The
    /// net-short case is reported as zero PnL rather than estimated from
    /// realized legs. `base_decimals` comes from the token metadata lookup
    /// and degrades the unrealized component to zero when absent.
    pub fn top_relayer_user_pnl(
        &self,
        relayer: Address,
        base_token: Address,
        quote_token: Address,
        top: usize,
        base_decimals: Option<u8>,
    ) -> Vec<UserPnL> {
        let pair = PairKey::new(base_token, quote_token);
        let last_price = self.last_pair_price(&pair);

        let mut sums: AHashMap<Address, SideSums> = AHashMap::new();
        for (key, record) in self.relayer_user_trades() {
            if key.relayer != relayer || key.pair != pair {
                continue;
            }
            let entry = sums.entry(key.user).or_default();
            entry.ask += record.volume_ask;
            entry.bid += record.volume_bid;
            entry.ask_by_quote += record.volume_ask_by_quote;
            entry.bid_by_quote += record.volume_bid_by_quote;
        }

        let mut users: Vec<UserPnL> = sums
            .into_iter()
            .map(|(user, s)| {
                let mut pnl = I256::ZERO;
                if s.bid >= s.ask {
                    if let Some(price) = last_price {
                        let unrealized = match base_decimals {
                            Some(decimals) => quote_value(s.bid - s.ask, price, decimals),
                            None => U256::ZERO,
                        };
                        pnl = signed(unrealized) + signed(s.ask_by_quote) - signed(s.bid_by_quote);
                    }
                }
                UserPnL {
                    user_address: user,
                    volume_ask: s.ask,
                    volume_bid: s.bid,
                    volume_ask_by_quote: s.ask_by_quote,
                    volume_bid_by_quote: s.bid_by_quote,
                    pn_l: pnl,
                    current_price: last_price.unwrap_or_default(),
                }
            })
            .collect();
        users.sort_by(|a, b| b.pn_l.cmp(&a.pn_l));

        let top = effective_top(top, users.len());
        users.truncate(top);
        users
    }

    /// Top users by quote volume on one exact (relayer, pair) scope.
    pub fn top_relayer_user_volume_by_pair(
        &self,
        relayer: Address,
        base_token: Address,
        quote_token: Address,
        from: i64,
        to: i64,
        top: usize,
    ) -> Vec<UserVolume> {
        let pair = PairKey::new(base_token, quote_token);
        let mut volumes: AHashMap<Address, U256> = AHashMap::new();
        for (key, record) in self.relayer_user_trades() {
            if key.relayer != relayer || key.pair != pair {
                continue;
            }
            if !time::in_range(key.bucket, from, to) {
                continue;
            }
            *volumes.entry(key.user).or_insert(U256::ZERO) += record.volume_by_quote;
        }

        let mut users: Vec<UserVolume> = volumes
            .into_iter()
            .map(|(user, volume)| UserVolume { user_address: user, volume, rank: 0 })
            .collect();
        users.sort_by(|a, b| b.volume.cmp(&a.volume));

        let top = effective_top(top, users.len());
        users.truncate(top);
        users
    }

    /// Distinct users that ever traded under `relayer` (zero = any relayer).
    /// No bot filter.
    pub fn number_users(&self, relayer: Address) -> usize {
        let mut users = AHashSet::new();
        for (key, _) in self.relayer_user_trades() {
            if relayer == ANY_ADDRESS || key.relayer == relayer {
                users.insert(key.user);
            }
        }
        users.len()
    }

    /// Distinct users under exactly `relayer` with activity in [from, to],
    /// optionally without bot addresses.
    pub fn number_traders_by_time(&self, relayer: Address, from: i64, to: i64, exclude_bots: bool) -> usize {
        let mut users = AHashSet::new();
        for (key, _) in self.relayer_user_trades() {
            if key.relayer != relayer {
                continue;
            }
            if exclude_bots && self.classifier().is_bot(key.user) {
                continue;
            }
            if time::in_range(key.bucket, from, to) {
                users.insert(key.user);
            }
        }
        users.len()
    }
}
