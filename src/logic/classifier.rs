use ahash::AHashSet;
use alloy_primitives::Address;
use std::str::FromStr;
use tracing::warn;

/// Membership tests for curated address lists.
///
/// The lists themselves are configuration data supplied at startup; only the
/// matching rules live here. Addresses are parsed once on construction, so
/// hex-case differences in the source lists cannot affect lookups.
#[derive(Clone, Debug, Default)]
pub struct TradeClassifier {
    wash_pairs: AHashSet<(Address, Address)>,
    bots: AHashSet<Address>,
}

fn ordered(a: Address, b: Address) -> (Address, Address) {
    if a <= b { (a, b) } else { (b, a) }
}

fn parse_address(raw: &str) -> Option<Address> {
    match Address::from_str(raw.trim()) {
        Ok(addr) => Some(addr),
        Err(err) => {
            warn!(address = raw, %err, "ignoring unparseable classifier address");
            None
        }
    }
}

impl TradeClassifier {
    /// Build a classifier from configured hex-address lists. Unparseable
    /// entries are dropped with a warning rather than failing startup.
    pub fn from_lists(wash_pairs: &[(String, String)], bots: &[String]) -> TradeClassifier {
        let wash_pairs = wash_pairs
            .iter()
            .filter_map(|(a, b)| Some(ordered(parse_address(a)?, parse_address(b)?)))
            .collect();
        let bots = bots.iter().filter_map(|a| parse_address(a)).collect();
        TradeClassifier { wash_pairs, bots }
    }

    /// True for self-trades and for counterparties on the curated wash list.
    /// Trades classified as wash skip the relayer-scoped update path; the
    /// global per-pair aggregates still absorb them.
    pub fn is_wash_trade(&self, a: Address, b: Address) -> bool {
        a == b || self.wash_pairs.contains(&ordered(a, b))
    }

    /// True if the address is on the curated bot list. Applied at query time
    /// only; bot trades still reach the underlying aggregates.
    pub fn is_bot(&self, address: Address) -> bool {
        self.bots.contains(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "0xbfc6e92daae38d49a978245e04acc98178770a36";
    const B: &str = "0x9D62A70c8E3587f0051AD56A111fEb738a43103E";

    fn classifier() -> TradeClassifier {
        TradeClassifier::from_lists(
            &[(A.to_string(), B.to_string())],
            &[B.to_string()],
        )
    }

    #[test]
    fn test_self_trade_is_wash() {
        let c = TradeClassifier::default();
        let addr = Address::repeat_byte(0x01);
        assert!(c.is_wash_trade(addr, addr));
    }

    #[test]
    fn test_wash_pair_matches_both_directions() {
        let c = classifier();
        let a = Address::from_str(A).unwrap();
        let b = Address::from_str(B).unwrap();
        assert!(c.is_wash_trade(a, b));
        assert!(c.is_wash_trade(b, a));
        assert!(!c.is_wash_trade(a, Address::repeat_byte(0x05)));
    }

    #[test]
    fn test_case_insensitive_lists() {
        // Same pair configured with shuffled hex casing
        let c = TradeClassifier::from_lists(
            &[(A.to_uppercase().replace("0X", "0x"), B.to_lowercase())],
            &[A.to_lowercase()],
        );
        let a = Address::from_str(A).unwrap();
        let b = Address::from_str(B).unwrap();
        assert!(c.is_wash_trade(a, b));
        assert!(c.is_bot(a));
    }

    #[test]
    fn test_bot_membership() {
        let c = classifier();
        assert!(c.is_bot(Address::from_str(B).unwrap()));
        assert!(!c.is_bot(Address::from_str(A).unwrap()));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let c = TradeClassifier::from_lists(
            &[("not-an-address".to_string(), B.to_string())],
            &["also-bad".to_string()],
        );
        let b = Address::from_str(B).unwrap();
        assert!(!c.is_wash_trade(Address::repeat_byte(0x01), b));
        assert!(!c.is_bot(b));
    }
}
