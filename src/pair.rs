use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite key identifying a trading pair by its token addresses.
///
/// All nested cache maps and snapshot records key pairs through this type so
/// key construction lives in one place instead of ad-hoc string formatting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub base: Address,
    pub quote: Address,
}

impl PairKey {
    pub fn new(base: Address, quote: Address) -> PairKey {
        PairKey { base, quote }
    }

    /// Filter used by the volume queries: the quote token must match exactly,
    /// the base token must be in the allow-list (empty list = wildcard).
    pub fn matches(&self, base_tokens: &[Address], quote_token: Address) -> bool {
        self.quote == quote_token && (base_tokens.is_empty() || base_tokens.contains(&self.base))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.base, self.quote)
    }
}
