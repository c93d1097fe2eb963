use ethers::types::{Address, U256};

/// Instantaneous price and in-range liquidity of a V3 pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
}

/// Outcome of a factory lookup for a pair and fee tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolLookup {
    Found { address: Address, state: PoolState },
    NotFound,
}

impl PoolLookup {
    pub fn state(&self) -> Option<&PoolState> {
        match self {
            PoolLookup::Found { state, .. } => Some(state),
            PoolLookup::NotFound => None,
        }
    }
}
