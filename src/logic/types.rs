use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

/// Serde helpers rendering big integers as decimal strings, the wire shape
/// used by both the snapshot file and the query result types.
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<T>().map_err(serde::de::Error::custom)
    }
}

/// One row of a volume ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVolume {
    pub user_address: Address,
    #[serde(with = "decimal")]
    pub volume: U256,
    /// 1-based position in the full ranking; zero when the query does not
    /// rank (exact-pair top volume).
    pub rank: usize,
}

/// Aggregate totals over a relayer/pair filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeVolume {
    #[serde(with = "decimal")]
    pub total_volume: U256,
    pub trader: u64,
}

/// Estimated profit-and-loss of one user on one (relayer, pair) scope.
///
/// The PnL figure is an approximation: open long inventory is valued at the
/// last observed trade price, and the net-short case is reported as zero
/// rather than estimated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPnL {
    pub user_address: Address,
    #[serde(with = "decimal")]
    pub volume_ask: U256,
    #[serde(with = "decimal")]
    pub volume_bid: U256,
    #[serde(with = "decimal")]
    pub volume_ask_by_quote: U256,
    #[serde(with = "decimal")]
    pub volume_bid_by_quote: U256,
    #[serde(with = "decimal")]
    pub pn_l: I256,
    #[serde(with = "decimal")]
    pub current_price: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_serializes_as_decimal_string() {
        let row = UserVolume {
            user_address: Address::repeat_byte(0x01),
            volume: U256::from(123456789u64),
            rank: 1,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"volume\":\"123456789\""));

        let back: UserVolume = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_negative_pnl_round_trips() {
        let row = UserPnL {
            user_address: Address::repeat_byte(0x02),
            volume_ask: U256::ZERO,
            volume_bid: U256::from(10u64),
            volume_ask_by_quote: U256::ZERO,
            volume_bid_by_quote: U256::from(50u64),
            pn_l: I256::try_from(-50i64).unwrap(),
            current_price: U256::from(5u64),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"pnL\":\"-50\""));

        let back: UserPnL = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
