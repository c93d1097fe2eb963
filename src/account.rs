//! Wallet-level reads used next to aggregation: ERC-20 balances and
//! allowances, and the operator approved on a position NFT.
//!
//! A malformed address reads as zero without touching the chain; only
//! transport and decode failures are returned as errors.

use crate::contracts::{Erc20, NonfungiblePositionManager};
use crate::types::conversions::string_to_address;
use anyhow::{Context, Result};
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use log::debug;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AccountReader<M: Middleware> {
    provider: Arc<M>,
    position_manager: Address,
}

fn parse(role: &str, raw: &str) -> Option<Address> {
    match string_to_address(raw) {
        Ok(addr) => Some(addr),
        Err(e) => {
            debug!("Invalid {} address, reading as zero: {}", role, e);
            None
        }
    }
}

impl<M: Middleware + 'static> AccountReader<M> {
    pub fn new(provider: Arc<M>, position_manager: Address) -> Self {
        Self {
            provider,
            position_manager,
        }
    }

    /// Raw `balanceOf(owner)` of `token`.
    pub async fn token_balance(&self, token: &str, owner: &str) -> Result<U256> {
        let (Some(token), Some(owner)) = (parse("token", token), parse("owner", owner)) else {
            return Ok(U256::zero());
        };
        Erc20::new(token, self.provider.clone())
            .balance_of(owner)
            .call()
            .await
            .with_context(|| format!("balanceOf({:?}) on {:?} failed", owner, token))
    }

    /// Raw `allowance(owner, spender)` of `token`.
    pub async fn token_allowance(&self, token: &str, owner: &str, spender: &str) -> Result<U256> {
        let (Some(token), Some(owner), Some(spender)) = (
            parse("token", token),
            parse("owner", owner),
            parse("spender", spender),
        ) else {
            return Ok(U256::zero());
        };
        Erc20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .with_context(|| format!("allowance({:?}, {:?}) on {:?} failed", owner, spender, token))
    }

    /// Address approved to transfer position `token_id`, zero when none.
    pub async fn approved_operator(&self, token_id: U256) -> Result<Address> {
        NonfungiblePositionManager::new(self.position_manager, self.provider.clone())
            .get_approved(token_id)
            .call()
            .await
            .with_context(|| format!("getApproved({}) failed", token_id))
    }
}
