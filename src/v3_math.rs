//! Uniswap V3 fixed-point math for valuing liquidity positions.
//!
//! Square-root prices are Q64.96 values held in `U256`; every product that can
//! exceed 256 bits goes through a 512-bit intermediate so results match the
//! on-chain `TickMath` / `SqrtPriceMath` libraries bit for bit.

use crate::error::SdkError;
use crate::types::PoolState;
use ethers::types::{U256, U512};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;
/// get_sqrt_ratio_at_tick(MIN_TICK)
pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]);
/// get_sqrt_ratio_at_tick(MAX_TICK)
pub const MAX_SQRT_RATIO: U256 = U256([6743328256752651558, 17280870778742802505, 4294805859, 0]);
/// 2^96
pub const Q96: U256 = U256([0, 4294967296, 0, 0]);

/// sqrt(1.0001^-2^i) in Q128.128 for i = 0..=19
const TICK_RATIO_FACTORS: [u128; 20] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
    0x48a170391f7dc42444e8fa2,
];

/// sqrt(1.0001^tick) * 2^96, rounded up (TickMath.getSqrtRatioAtTick).
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, SdkError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(SdkError::InvalidTick(tick));
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from(TICK_RATIO_FACTORS[0])
    } else {
        U256::one() << 128
    };

    for (bit, factor) in TICK_RATIO_FACTORS.iter().enumerate().skip(1) {
        if abs_tick & (1u32 << bit) != 0 {
            // ratio <= 2^128 and factor < 2^128, the product fits in 256 bits
            ratio = (ratio * U256::from(*factor)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the result never undershoots the tick
    let round_up = if ratio.low_u32() == 0 { 0u64 } else { 1u64 };
    Ok((ratio >> 32) + U256::from(round_up))
}

/// Greatest tick whose sqrt ratio is <= `sqrt_price_x96` (TickMath.getTickAtSqrtRatio).
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> Result<i32, SdkError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(SdkError::InvalidSqrtPrice(sqrt_price_x96));
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK - 1;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if get_sqrt_ratio_at_tick(mid)? <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// floor(a * b / denominator) with a 512-bit intermediate product.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, SdkError> {
    if denominator.is_zero() {
        return Err(SdkError::DivisionByZero("mul_div"));
    }
    let quotient = (U512::from(a) * U512::from(b)) / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| SdkError::MathOverflow("mul_div"))
}

/// ceil(a * b / denominator) with a 512-bit intermediate product.
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, SdkError> {
    if denominator.is_zero() {
        return Err(SdkError::DivisionByZero("mul_div_rounding_up"));
    }
    let (quotient, remainder) = (U512::from(a) * U512::from(b)).div_mod(U512::from(denominator));
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient + U512::one()
    };
    U256::try_from(quotient).map_err(|_| SdkError::MathOverflow("mul_div_rounding_up"))
}

fn div_rounding_up(a: U256, b: U256) -> Result<U256, SdkError> {
    if b.is_zero() {
        return Err(SdkError::DivisionByZero("div_rounding_up"));
    }
    let (quotient, remainder) = a.div_mod(b);
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::one())
    }
}

fn sort_ratios(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Token0 needed to cover `liquidity` between two sqrt prices:
/// `L * 2^96 * (sqrt_b - sqrt_a) / sqrt_b / sqrt_a`.
pub fn get_amount0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, SdkError> {
    let (sqrt_a, sqrt_b) = sort_ratios(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if sqrt_a.is_zero() {
        return Err(SdkError::DivisionByZero("get_amount0_delta"));
    }

    let numerator1 = U256::from(liquidity) << 96;
    let numerator2 = sqrt_b - sqrt_a;

    if round_up {
        div_rounding_up(mul_div_rounding_up(numerator1, numerator2, sqrt_b)?, sqrt_a)
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_b)? / sqrt_a)
    }
}

/// Token1 needed to cover `liquidity` between two sqrt prices:
/// `L * (sqrt_b - sqrt_a) / 2^96`.
pub fn get_amount1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, SdkError> {
    let (sqrt_a, sqrt_b) = sort_ratios(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    let diff = sqrt_b - sqrt_a;

    if round_up {
        mul_div_rounding_up(U256::from(liquidity), diff, Q96)
    } else {
        mul_div(U256::from(liquidity), diff, Q96)
    }
}

/// Token amounts held by `liquidity` in [sqrt_a, sqrt_b] at `sqrt_price_x96`,
/// rounded down (LiquidityAmounts.getAmountsForLiquidity).
pub fn get_amounts_for_liquidity(
    sqrt_price_x96: U256,
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
) -> Result<(U256, U256), SdkError> {
    let (sqrt_a, sqrt_b) = sort_ratios(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

    if sqrt_price_x96 <= sqrt_a {
        Ok((get_amount0_delta(sqrt_a, sqrt_b, liquidity, false)?, U256::zero()))
    } else if sqrt_price_x96 < sqrt_b {
        Ok((
            get_amount0_delta(sqrt_price_x96, sqrt_b, liquidity, false)?,
            get_amount1_delta(sqrt_a, sqrt_price_x96, liquidity, false)?,
        ))
    } else {
        Ok((U256::zero(), get_amount1_delta(sqrt_a, sqrt_b, liquidity, false)?))
    }
}

/// Raw (amount0, amount1) a position of `liquidity` in [tick_lower, tick_upper]
/// holds in `pool`.
///
/// The range is selected by the pool's current tick: below the range the
/// position is all token0, at or above `tick_upper` it is all token1, and in
/// between both amounts are taken from the pool's sqrt price. Amounts are
/// rounded down, i.e. what a withdrawal would return.
pub fn compute_amounts(
    pool: &PoolState,
    liquidity: u128,
    tick_lower: i32,
    tick_upper: i32,
) -> Result<(U256, U256), SdkError> {
    if tick_lower > tick_upper {
        return Err(SdkError::InvalidRange {
            lower: tick_lower,
            upper: tick_upper,
        });
    }
    let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

    if pool.tick < tick_lower {
        Ok((
            get_amount0_delta(sqrt_lower, sqrt_upper, liquidity, false)?,
            U256::zero(),
        ))
    } else if pool.tick < tick_upper {
        if pool.sqrt_price_x96 < MIN_SQRT_RATIO || pool.sqrt_price_x96 >= MAX_SQRT_RATIO {
            return Err(SdkError::InvalidSqrtPrice(pool.sqrt_price_x96));
        }
        Ok((
            get_amount0_delta(pool.sqrt_price_x96, sqrt_upper, liquidity, false)?,
            get_amount1_delta(sqrt_lower, pool.sqrt_price_x96, liquidity, false)?,
        ))
    } else {
        Ok((
            U256::zero(),
            get_amount1_delta(sqrt_lower, sqrt_upper, liquidity, false)?,
        ))
    }
}

/// Converts a tick to a raw token1/token0 price (display only, not decimal adjusted).
pub fn tick_to_price(tick: i32) -> f64 {
    1.0001f64.powi(tick)
}
