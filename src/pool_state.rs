use crate::contracts::{IUniswapV3Factory, IUniswapV3Pool};
use crate::multicall::{Call, Multicall};
use crate::types::conversions::i256_to_i32;
use crate::types::{PoolLookup, PoolState};
use crate::v3_math::{MAX_TICK, MIN_TICK};
use anyhow::{Context, Result};
use ethers::abi::Token as AbiToken;
use ethers::providers::Middleware;
use ethers::types::{Address, I256};
use log::debug;
use std::sync::Arc;

/// Finds the V3 pool for a pair and fee tier and reads its current state.
#[derive(Debug, Clone)]
pub struct PoolStateResolver<M: Middleware> {
    provider: Arc<M>,
    multicall: Arc<Multicall<M>>,
    factory: Address,
}

impl<M: Middleware + 'static> PoolStateResolver<M> {
    pub fn new(provider: Arc<M>, multicall: Arc<Multicall<M>>, factory: Address) -> Self {
        Self {
            provider,
            multicall,
            factory,
        }
    }

    /// Pool for the unordered pair at `fee`, or `NotFound` when the factory has none.
    pub async fn resolve(&self, token_a: Address, token_b: Address, fee: u32) -> Result<PoolLookup> {
        let factory = IUniswapV3Factory::new(self.factory, self.provider.clone());
        let pool = factory
            .get_pool(token_a, token_b, fee)
            .call()
            .await
            .with_context(|| format!("getPool({:?}, {:?}, {}) failed", token_a, token_b, fee))?;

        if pool.is_zero() {
            debug!("No pool for {:?}/{:?} fee={}", token_a, token_b, fee);
            return Ok(PoolLookup::NotFound);
        }

        let state = self.read_state(pool).await?;
        debug!(
            "Pool {:?}: tick={} liquidity={} sqrtPriceX96={}",
            pool, state.tick, state.liquidity, state.sqrt_price_x96
        );
        Ok(PoolLookup::Found {
            address: pool,
            state,
        })
    }

    /// Reads `slot0()` and `liquidity()` in a single multicall so both come from the same block.
    pub async fn read_state(&self, pool: Address) -> Result<PoolState> {
        let contract = IUniswapV3Pool::new(pool, self.provider.clone());
        let slot0_fn = contract.abi().function("slot0")?;
        let liquidity_fn = contract.abi().function("liquidity")?;

        let calls = vec![
            Call::new(pool, slot0_fn.encode_input(&[])?),
            Call::new(pool, liquidity_fn.encode_input(&[])?),
        ];
        let mut results = self.multicall.run(calls, None).await?.into_iter();

        let slot0_raw = results
            .next()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("slot0() reverted on pool {:?}", pool))?;
        let liquidity_raw = results
            .next()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("liquidity() reverted on pool {:?}", pool))?;

        let mut slot0 = slot0_fn
            .decode_output(&slot0_raw)
            .with_context(|| format!("slot0() of {:?} did not decode", pool))?
            .into_iter();
        let sqrt_price_x96 = slot0
            .next()
            .and_then(AbiToken::into_uint)
            .ok_or_else(|| anyhow::anyhow!("slot0() of {:?} has no sqrtPriceX96", pool))?;
        let tick_raw = slot0
            .next()
            .and_then(AbiToken::into_int)
            .ok_or_else(|| anyhow::anyhow!("slot0() of {:?} has no tick", pool))?;
        let tick = i256_to_i32(I256::from_raw(tick_raw))?;
        if !(MIN_TICK..=MAX_TICK).contains(&tick) {
            anyhow::bail!("Tick {} of pool {:?} outside Uniswap V3 valid range", tick, pool);
        }

        let liquidity = liquidity_fn
            .decode_output(&liquidity_raw)
            .with_context(|| format!("liquidity() of {:?} did not decode", pool))?
            .into_iter()
            .next()
            .and_then(AbiToken::into_uint)
            .and_then(|l| u128::try_from(l).ok())
            .ok_or_else(|| anyhow::anyhow!("liquidity() of {:?} is not a uint128", pool))?;

        Ok(PoolState {
            sqrt_price_x96,
            tick,
            liquidity,
        })
    }
}
