use crate::types::conversions::serialize_display;
use crate::types::token::Token;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

/// Raw `positions(tokenId)` record from the NonfungiblePositionManager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnChainPosition {
    pub token_id: U256,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

/// A collateral-eligible position with its underlying amounts computed
/// against the pool's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(serialize_with = "serialize_display")]
    pub token_id: U256,
    pub token0: Token,
    pub token1: Token,
    #[serde(serialize_with = "serialize_display")]
    pub fee: u32,
    #[serde(serialize_with = "serialize_display")]
    pub liquidity: u128,
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// Human-readable token0 amount
    pub amount0: String,
    /// Human-readable token1 amount
    pub amount1: String,
}

impl Position {
    /// `amount0 * price0 + amount1 * price1`, `None` if it overflows `Decimal`.
    pub fn usd_value(&self) -> Option<Decimal> {
        let amount0 = Decimal::from_str(&self.amount0).ok()?;
        let amount1 = Decimal::from_str(&self.amount1).ok()?;
        let value0 = amount0.checked_mul(self.token0.price)?;
        let value1 = amount1.checked_mul(self.token1.price)?;
        value0.checked_add(value1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(amount0: &str, amount1: &str) -> Position {
        Position {
            token_id: U256::from(7u64),
            token0: Token::new(Address::from_low_u64_be(1), "WETH", 18, Decimal::from(2500)),
            token1: Token::new(Address::from_low_u64_be(2), "USDC", 6, Decimal::ONE),
            fee: 500,
            liquidity: 1_000,
            tick_lower: -600,
            tick_upper: 600,
            amount0: amount0.to_string(),
            amount1: amount1.to_string(),
        }
    }

    #[test]
    fn usd_value_sums_both_legs() {
        let p = position("1.5", "250.25");
        assert_eq!(p.usd_value(), Some(Decimal::from_str("4000.25").unwrap()));
        assert_eq!(position("0", "0").usd_value(), Some(Decimal::ZERO));
    }

    #[test]
    fn serializes_ids_as_decimal_strings() {
        let json = serde_json::to_value(position("1", "2")).unwrap();
        assert_eq!(json["tokenId"], "7");
        assert_eq!(json["fee"], "500");
        assert_eq!(json["liquidity"], "1000");
        assert_eq!(json["amount0"], "1");
        assert_eq!(json["token1"]["symbol"], "USDC");
    }
}
