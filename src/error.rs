use ethers::types::{Address, U256};

/// Domain errors raised by the math layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("Tick {0} outside Uniswap V3 valid range [-887272, 887272]")]
    InvalidTick(i32),
    #[error("Invalid tick range: lower {lower} > upper {upper}")]
    InvalidRange { lower: i32, upper: i32 },
    #[error("sqrtPriceX96 {0} outside valid range")]
    InvalidSqrtPrice(U256),
    #[error("Arithmetic overflow in {0}")]
    MathOverflow(&'static str),
    #[error("Division by zero in {0}")]
    DivisionByZero(&'static str),
}

/// Why a single position was left out of an aggregation.
///
/// Exclusions never abort the aggregation; they are collected next to the
/// included positions so callers can inspect them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Exclusion {
    #[error("failed to read position record: {0}")]
    PositionRead(String),
    #[error("no pool for {token0:?}/{token1:?} at fee {fee}")]
    PoolNotFound {
        token0: Address,
        token1: Address,
        fee: u32,
    },
    #[error("failed to read pool state: {0}")]
    PoolRead(String),
    #[error("supported-assets lookup failed: {0}")]
    AllowList(String),
    #[error("token pair {token0:?}/{token1:?} is not fully supported as collateral")]
    Ineligible { token0: Address, token1: Address },
    #[error("token metadata unavailable for {0:?}")]
    TokenMetadata(Address),
    #[error("amount computation failed: {0}")]
    Math(#[from] SdkError),
}

impl Exclusion {
    /// Expected outcomes (no pool, unsupported pair) as opposed to read or math failures.
    pub fn is_expected(&self) -> bool {
        matches!(self, Exclusion::PoolNotFound { .. } | Exclusion::Ineligible { .. })
    }
}
