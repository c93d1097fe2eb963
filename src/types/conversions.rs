use ethers::types::{Address, I256, U256};
use rust_decimal::Decimal;
use serde::Serializer;
use std::fmt::Display;
use std::str::FromStr;

/// Renders `value / 10^decimals` as an exact decimal string.
///
/// Trailing fractional zeros are trimmed and zero renders as `"0"`, so
/// `1_500_000` with 6 decimals becomes `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let digits = value.to_string();
    let d = decimals as usize;
    if d == 0 {
        return digits;
    }

    let (int_part, frac_part) = if digits.len() <= d {
        ("0".to_string(), format!("{}{}", "0".repeat(d - digits.len()), digits))
    } else {
        let split = digits.len() - d;
        (digits[..split].to_string(), digits[split..].to_string())
    };

    let frac_trimmed = frac_part.trim_end_matches('0');
    if frac_trimmed.is_empty() {
        int_part
    } else {
        format!("{}.{}", int_part, frac_trimmed)
    }
}

/// Converts a raw on-chain amount to a `Decimal` scaled by the token decimals.
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    Decimal::from_str(&format_units(value, decimals))
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))
}

// V3 ticks are int24 on chain and arrive as I256
pub fn i256_to_i32(value: I256) -> Result<i32, ConversionError> {
    let as_i128: i128 = value.try_into().map_err(|_| ConversionError::Overflow)?;

    i32::try_from(as_i128).map_err(|_| ConversionError::Overflow)
}

pub fn address_to_string(addr: Address) -> String {
    format!("{:?}", addr).to_lowercase()
}

/// Parses a `0x`-prefixed, 40 hex digit address. Case is ignored.
pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ConversionError::InvalidAddress(trimmed.to_string()))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConversionError::InvalidAddress(trimmed.to_string()));
    }
    Address::from_str(hex).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

/// Serializes any `Display` value (token ids, liquidity, fee) as a decimal string.
pub fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Overflow in conversion")]
    Overflow,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_units_trims_and_pads() {
        assert_eq!(format_units(U256::zero(), 18), "0");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
        assert_eq!(format_units(U256::from(5u64), 3), "0.005");
        assert_eq!(format_units(U256::exp10(18), 18), "1");
        assert_eq!(
            format_units(U256::from(29553010879137169u64), 18),
            "0.029553010879137169"
        );
    }

    #[test]
    fn u256_to_decimal_scales() {
        let d = u256_to_decimal(U256::from(300_012_345_678u64), 8).unwrap();
        assert_eq!(d, Decimal::from_str("3000.12345678").unwrap());
    }

    #[test]
    fn address_parsing_is_strict_about_shape_but_not_case() {
        let lower = string_to_address("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913").unwrap();
        let mixed = string_to_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(address_to_string(mixed), "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");

        assert!(string_to_address("").is_err());
        assert!(string_to_address("833589fcd6edb6e08f4c7c32d4f71b54bda02913").is_err());
        assert!(string_to_address("0x1234").is_err());
        assert!(string_to_address("0xzz3589fcd6edb6e08f4c7c32d4f71b54bda02913").is_err());
    }

    #[test]
    fn tick_conversion_rejects_out_of_range() {
        assert_eq!(i256_to_i32(I256::from(-887272i64)).unwrap(), -887272);
        assert!(i256_to_i32(I256::from(i64::MAX)).is_err());
    }
}
