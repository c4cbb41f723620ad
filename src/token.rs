use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Convert a base-asset amount into quote-asset terms at the given price,
/// dividing out the base token's decimal exponent.
pub fn quote_value(amount: U256, price: U256, decimals: u8) -> U256 {
    let exp = U256::from(10).pow(U256::from(decimals));
    amount * price / exp
}

/// Token metadata as served by the external token store. Only the decimals
/// matter to the aggregation path; the symbol is carried for display.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Token {
    address: Address,
    decimals: u8,
    symbol: Option<String>,
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.get_address()
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.get_address())
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Token {
    pub fn new(address: Address) -> Token {
        Token { address, decimals: 18, ..Token::default() }
    }

    pub fn new_with_data(address: Address, symbol: Option<String>, decimals: Option<u8>) -> Token {
        Token { address, symbol, decimals: decimals.unwrap_or(18) }
    }

    // For testing purposes
    pub fn random() -> Token {
        Token::new(Address::random())
    }

    pub fn get_symbol(&self) -> String {
        self.symbol.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    pub fn get_exp(&self) -> U256 {
        U256::from(10).pow(U256::from(self.decimals))
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    /// Quote-equivalent value of `amount` base units at `price`.
    pub fn quote_value(&self, amount: U256, price: U256) -> U256 {
        quote_value(amount, price, self.decimals)
    }

    /// Display ratio helper. Never used in the accumulation path.
    pub fn to_float(&self, value: U256) -> f64 {
        if self.decimals == 0 {
            0f64
        } else {
            let divider = self.get_exp();
            let ret = value.div_rem(divider);

            let div = u64::try_from(ret.0);
            let rem = u64::try_from(ret.1);

            if div.is_err() || rem.is_err() {
                0f64
            } else {
                div.unwrap_or_default() as f64 + ((rem.unwrap_or_default() as f64) / (10u64.pow(self.decimals as u32) as f64))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quote_value() {
        // 2.0 base units at price 3 quote-wei per base unit
        let amount = U256::from(2_000_000_000_000_000_000u128);
        let price = U256::from(3u64);
        assert_eq!(quote_value(amount, price, 18), U256::from(6u64));
    }

    #[test]
    fn test_quote_value_floors() {
        let amount = U256::from(1_500u64);
        let price = U256::from(1u64);
        assert_eq!(quote_value(amount, price, 3), U256::from(1u64));
    }

    #[test]
    fn test_serialize() {
        let token = Token::new_with_data(Address::repeat_byte(0x11), Some("TST".to_string()), Some(18));

        let serialized = serde_json::to_string(&token).unwrap();
        assert_eq!(
            serialized,
            "{\"address\":\"0x1111111111111111111111111111111111111111\",\"decimals\":18,\"symbol\":\"TST\"}"
        );
    }
}
