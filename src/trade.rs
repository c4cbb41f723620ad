use crate::pair::PairKey;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Side of the taker order that produced a fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Executed spot trade as delivered by the record store. Immutable input
/// event; the cache never writes back to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub maker: Address,
    pub taker: Address,
    pub maker_exchange: Address,
    pub taker_exchange: Address,
    pub base_token: Address,
    pub quote_token: Address,
    pub amount: U256,
    pub price_point: U256,
    pub taker_side: TradeSide,
    pub created_at: i64,
}

impl Trade {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.base_token, self.quote_token)
    }

    pub fn is_self_match(&self) -> bool {
        self.maker == self.taker
    }

    /// The relayers credited with this trade, deduplicated so a self-relayed
    /// trade is not counted twice.
    pub fn relayers(&self) -> Vec<Address> {
        if self.maker_exchange == self.taker_exchange {
            vec![self.maker_exchange]
        } else {
            vec![self.maker_exchange, self.taker_exchange]
        }
    }
}

/// Executed lending trade. The lending engine only aggregates participation
/// counts, but the full event is carried for parity with the record store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingTrade {
    pub investor: Address,
    pub borrower: Address,
    pub investing_relayer: Address,
    pub borrowing_relayer: Address,
    pub term: u64,
    pub lending_token: Address,
    pub amount: U256,
    pub created_at: i64,
}

impl LendingTrade {
    /// The (relayer, user) sides credited with this trade, deduplicated when
    /// both sides collapse onto the same relayer and user.
    pub fn sides(&self) -> Vec<(Address, Address)> {
        let investing = (self.investing_relayer, self.investor);
        let borrowing = (self.borrowing_relayer, self.borrower);
        if investing == borrowing {
            vec![investing]
        } else {
            vec![investing, borrowing]
        }
    }
}

/// Operation attached to a change-feed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeOperation {
    Insert,
    Update,
    Replace,
}

/// Change-feed event for the spot trade collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeChangeEvent {
    pub operation_type: ChangeOperation,
    pub full_document: Trade,
}

/// Change-feed event for the lending trade collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingTradeChangeEvent {
    pub operation_type: ChangeOperation,
    pub full_document: LendingTrade,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            maker: Address::repeat_byte(0x01),
            taker: Address::repeat_byte(0x02),
            maker_exchange: Address::repeat_byte(0x0a),
            taker_exchange: Address::repeat_byte(0x0b),
            base_token: Address::repeat_byte(0x10),
            quote_token: Address::repeat_byte(0x20),
            amount: U256::from(100u64),
            price_point: U256::from(5u64),
            taker_side: TradeSide::Buy,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_relayers_deduplicated() {
        let mut trade = sample_trade();
        assert_eq!(trade.relayers().len(), 2);

        trade.taker_exchange = trade.maker_exchange;
        assert_eq!(trade.relayers(), vec![trade.maker_exchange]);
    }

    #[test]
    fn test_side_round_trip() {
        assert_eq!(TradeSide::Buy.to_string(), "BUY");
        assert_eq!("SELL".parse::<TradeSide>().unwrap(), TradeSide::Sell);
    }

    #[test]
    fn test_lending_sides_collapse() {
        let relayer = Address::repeat_byte(0x0a);
        let user = Address::repeat_byte(0x01);
        let trade = LendingTrade {
            investor: user,
            borrower: user,
            investing_relayer: relayer,
            borrowing_relayer: relayer,
            term: 86400,
            lending_token: Address::repeat_byte(0x10),
            amount: U256::from(1u64),
            created_at: 1_700_000_000,
        };
        assert_eq!(trade.sides(), vec![(relayer, user)]);
    }
}
