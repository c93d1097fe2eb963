//! # Chain Access
//!
//! The aggregation pipeline never talks to a provider directly. Everything it
//! needs from the chain goes through [`PositionSource`], which keeps the
//! pipeline independent of the RPC transport and lets tests drive it with an
//! in-memory source.
//!
//! [`OnChainSource`] is the production implementation: it wires the token,
//! position, pool and allow-list readers to one provider and one shared
//! Multicall3 executor.

use crate::eligibility::{AllowList, SupportedAssets};
use crate::multicall::Multicall;
use crate::pool_state::PoolStateResolver;
use crate::position_enumerator::PositionEnumerator;
use crate::settings::NetworkConfig;
use crate::token_resolver::TokenResolver;
use crate::types::{OnChainPosition, PoolLookup, Token};
use anyhow::Result;
use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::Arc;

/// Read access to everything position aggregation depends on.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Position token ids held by `owner`, in enumeration order.
    async fn list_position_ids(&self, owner: Address) -> Result<Vec<U256>>;

    /// The position record of `token_id`.
    async fn position(&self, token_id: U256) -> Result<OnChainPosition>;

    /// Pool of the pair at `fee` and its current state.
    async fn pool_state(&self, token_a: Address, token_b: Address, fee: u32) -> Result<PoolLookup>;

    /// Metadata and price for each address; unreadable tokens are absent.
    async fn tokens(&self, addresses: &[Address]) -> HashMap<Address, Token>;

    /// The subset of `candidates` the options platform supports.
    async fn supported_assets(&self, candidates: &[Address]) -> Result<AllowList>;
}

/// [`PositionSource`] backed by an ethers provider.
#[derive(Debug, Clone)]
pub struct OnChainSource<M: Middleware> {
    tokens: TokenResolver<M>,
    positions: PositionEnumerator<M>,
    pools: PoolStateResolver<M>,
    assets: SupportedAssets<M>,
}

impl<M: Middleware + 'static> OnChainSource<M> {
    pub fn new(provider: Arc<M>, network: &NetworkConfig) -> Self {
        let multicall = Arc::new(Multicall::new(
            provider.clone(),
            network.multicall,
            network.multicall_batch_size,
        ));

        Self {
            tokens: TokenResolver::new(provider.clone(), multicall.clone(), network.price_feeds.clone()),
            positions: PositionEnumerator::new(provider.clone(), multicall.clone(), network.position_manager),
            pools: PoolStateResolver::new(provider.clone(), multicall.clone(), network.uniswap_v3_factory),
            assets: SupportedAssets::new(provider, multicall, network.options_platform),
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> PositionSource for OnChainSource<M> {
    async fn list_position_ids(&self, owner: Address) -> Result<Vec<U256>> {
        self.positions.list_position_ids(owner).await
    }

    async fn position(&self, token_id: U256) -> Result<OnChainPosition> {
        self.positions.position(token_id).await
    }

    async fn pool_state(&self, token_a: Address, token_b: Address, fee: u32) -> Result<PoolLookup> {
        self.pools.resolve(token_a, token_b, fee).await
    }

    async fn tokens(&self, addresses: &[Address]) -> HashMap<Address, Token> {
        self.tokens.resolve(addresses).await
    }

    async fn supported_assets(&self, candidates: &[Address]) -> Result<AllowList> {
        self.assets.load(candidates).await
    }
}
