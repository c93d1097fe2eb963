use crate::types::conversions::format_units;
use ethers::types::{Address, I256};
use log::warn;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

/// ERC-20 metadata plus the USD price read from its oracle feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    /// USD price, zero when the token has no usable feed
    pub price: Decimal,
    pub logo: String,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8, price: Decimal) -> Self {
        let symbol = symbol.into();
        let logo = format!("/tokenLogos/{}.png", symbol);
        Self {
            address,
            symbol,
            decimals,
            price,
            logo,
        }
    }
}

/// Raw `latestAnswer()` / `decimals()` pair read from a price feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleReading {
    pub feed: Address,
    pub raw_answer: Option<I256>,
    pub feed_decimals: Option<u8>,
}

impl OracleReading {
    /// Reading for a token without a configured feed.
    pub fn unavailable() -> Self {
        Self {
            feed: Address::zero(),
            raw_answer: None,
            feed_decimals: None,
        }
    }

    /// `raw_answer / 10^feed_decimals`.
    ///
    /// Degrades to zero on a zero-address feed, a missing, zero or negative
    /// answer, or missing/zero feed decimals. Never fails.
    pub fn price(&self) -> Decimal {
        if self.feed.is_zero() {
            return Decimal::ZERO;
        }
        let (answer, decimals) = match (self.raw_answer, self.feed_decimals) {
            (Some(a), Some(d)) if a > I256::zero() && d > 0 => (a, d),
            _ => return Decimal::ZERO,
        };

        let rendered = format_units(answer.into_raw(), decimals);
        match Decimal::from_str(&rendered) {
            Ok(price) => price,
            Err(e) => {
                warn!("Unrepresentable price {} from feed {:?}: {}", rendered, self.feed, e);
                Decimal::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> Address {
        Address::from_low_u64_be(0xfeed)
    }

    #[test]
    fn price_scales_by_feed_decimals() {
        let reading = OracleReading {
            feed: feed(),
            raw_answer: Some(I256::from(312_345_000_000i64)),
            feed_decimals: Some(8),
        };
        assert_eq!(reading.price(), Decimal::from_str("3123.45").unwrap());

        let reading = OracleReading {
            feed: feed(),
            raw_answer: Some(I256::from(100_020_000i64)),
            feed_decimals: Some(8),
        };
        assert_eq!(reading.price(), Decimal::from_str("1.0002").unwrap());
    }

    #[test]
    fn price_is_zero_for_zero_feed_or_zero_answer() {
        for decimals in [None, Some(0u8), Some(6), Some(8), Some(18), Some(255)] {
            let zero_feed = OracleReading {
                feed: Address::zero(),
                raw_answer: Some(I256::from(123_456_789i64)),
                feed_decimals: decimals,
            };
            assert_eq!(zero_feed.price(), Decimal::ZERO);

            let zero_answer = OracleReading {
                feed: feed(),
                raw_answer: Some(I256::zero()),
                feed_decimals: decimals,
            };
            assert_eq!(zero_answer.price(), Decimal::ZERO);
        }
    }

    #[test]
    fn price_is_zero_for_missing_or_negative_answer() {
        assert_eq!(OracleReading::unavailable().price(), Decimal::ZERO);

        let negative = OracleReading {
            feed: feed(),
            raw_answer: Some(I256::from(-5i64)),
            feed_decimals: Some(8),
        };
        assert_eq!(negative.price(), Decimal::ZERO);

        let no_decimals = OracleReading {
            feed: feed(),
            raw_answer: Some(I256::from(5i64)),
            feed_decimals: None,
        };
        assert_eq!(no_decimals.price(), Decimal::ZERO);
    }

    #[test]
    fn token_logo_follows_symbol() {
        let t = Token::new(Address::zero(), "WETH", 18, Decimal::ZERO);
        assert_eq!(t.logo, "/tokenLogos/WETH.png");
    }
}
