use crate::contracts::NonfungiblePositionManager;
use crate::multicall::{Call, Multicall};
use crate::types::conversions::string_to_address;
use crate::types::OnChainPosition;
use anyhow::{Context, Result};
use ethers::abi::Token as AbiToken;
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use log::{debug, info};
use std::sync::Arc;

/// Lists and reads a wallet's NonfungiblePositionManager positions.
#[derive(Debug, Clone)]
pub struct PositionEnumerator<M: Middleware> {
    provider: Arc<M>,
    multicall: Arc<Multicall<M>>,
    position_manager: Address,
}

impl<M: Middleware + 'static> PositionEnumerator<M> {
    pub fn new(provider: Arc<M>, multicall: Arc<Multicall<M>>, position_manager: Address) -> Self {
        Self {
            provider,
            multicall,
            position_manager,
        }
    }

    fn manager(&self) -> NonfungiblePositionManager<M> {
        NonfungiblePositionManager::new(self.position_manager, self.provider.clone())
    }

    /// Token ids owned by `owner`; a missing or malformed owner yields an empty list.
    pub async fn list_position_ids_str(&self, owner: Option<&str>) -> Result<Vec<U256>> {
        match owner.map(string_to_address) {
            Some(Ok(addr)) => self.list_position_ids(addr).await,
            _ => {
                debug!("No valid owner address, nothing to enumerate");
                Ok(Vec::new())
            }
        }
    }

    /// Token ids owned by `owner` in the contract's enumeration order.
    ///
    /// Reads `balanceOf(owner)`, then every `tokenOfOwnerByIndex(owner, i)` in
    /// one batch. Any failure here is returned: without the id list there is
    /// nothing to examine.
    pub async fn list_position_ids(&self, owner: Address) -> Result<Vec<U256>> {
        if owner.is_zero() {
            return Ok(Vec::new());
        }

        let manager = self.manager();
        let count = manager
            .balance_of(owner)
            .call()
            .await
            .with_context(|| format!("balanceOf({:?}) failed", owner))?;
        let count = u64::try_from(count)
            .map_err(|_| anyhow::anyhow!("balanceOf({:?}) returned {}", owner, count))?;

        if count == 0 {
            info!("Owner {:?} holds no positions", owner);
            return Ok(Vec::new());
        }

        let index_fn = manager.abi().function("tokenOfOwnerByIndex")?;
        let mut calls = Vec::with_capacity(count as usize);
        for index in 0..count {
            let call_data = index_fn.encode_input(&[
                AbiToken::Address(owner),
                AbiToken::Uint(U256::from(index)),
            ])?;
            calls.push(Call::new(self.position_manager, call_data));
        }

        let results = self.multicall.run(calls, None).await?;

        let mut ids = Vec::with_capacity(results.len());
        for (index, raw) in results.into_iter().enumerate() {
            let id = raw
                .and_then(|bytes| index_fn.decode_output(&bytes).ok())
                .and_then(|tokens| tokens.into_iter().next())
                .and_then(AbiToken::into_uint)
                .ok_or_else(|| {
                    anyhow::anyhow!("tokenOfOwnerByIndex({:?}, {}) failed", owner, index)
                })?;
            ids.push(id);
        }

        info!("Owner {:?} holds {} positions", owner, ids.len());
        Ok(ids)
    }

    /// Reads the `positions(tokenId)` record.
    pub async fn position(&self, token_id: U256) -> Result<OnChainPosition> {
        let (
            _nonce,
            _operator,
            token0,
            token1,
            fee,
            tick_lower,
            tick_upper,
            liquidity,
            _fee_growth_inside0,
            _fee_growth_inside1,
            _tokens_owed0,
            _tokens_owed1,
        ) = self
            .manager()
            .positions(token_id)
            .call()
            .await
            .with_context(|| format!("positions({}) failed", token_id))?;

        Ok(OnChainPosition {
            token_id,
            token0,
            token1,
            fee,
            tick_lower,
            tick_upper,
            liquidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::testing::{aggregate3_reply, mocked, queue, MockClient};
    use ethers::abi::encode;
    use ethers::providers::MockProvider;
    use ethers::types::{Bytes, I256};

    fn owner() -> Address {
        Address::from_low_u64_be(0xaa)
    }

    fn enumerator() -> (PositionEnumerator<MockClient>, MockProvider) {
        let (provider, mock, multicall) = mocked();
        (
            PositionEnumerator::new(provider, multicall, Address::from_low_u64_be(0x9f3)),
            mock,
        )
    }

    fn uint(value: u64) -> Vec<u8> {
        encode(&[AbiToken::Uint(U256::from(value))])
    }

    #[tokio::test]
    async fn missing_or_malformed_owner_lists_nothing() {
        // nothing queued: any request would fail
        let (enumerator, _mock) = enumerator();

        assert!(enumerator.list_position_ids_str(None).await.unwrap().is_empty());
        assert!(enumerator.list_position_ids_str(Some("bad")).await.unwrap().is_empty());
        assert!(enumerator.list_position_ids_str(Some("0x1234")).await.unwrap().is_empty());
        assert!(enumerator.list_position_ids(Address::zero()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_follow_enumeration_order() {
        let (enumerator, mock) = enumerator();
        queue(
            &mock,
            vec![
                Bytes::from(uint(3)),
                aggregate3_reply(&[Some(uint(42)), Some(uint(7)), Some(uint(19))]),
            ],
        );

        let ids = enumerator
            .list_position_ids_str(Some("0x00000000000000000000000000000000000000aa"))
            .await
            .unwrap();
        assert_eq!(ids, vec![U256::from(42u64), U256::from(7u64), U256::from(19u64)]);
    }

    #[tokio::test]
    async fn zero_balance_skips_the_index_batch() {
        let (enumerator, mock) = enumerator();
        queue(&mock, vec![Bytes::from(uint(0))]);

        assert!(enumerator.list_position_ids(owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_index_read_is_an_error() {
        let (enumerator, mock) = enumerator();
        queue(
            &mock,
            vec![
                Bytes::from(uint(2)),
                aggregate3_reply(&[Some(uint(42)), None]),
            ],
        );

        assert!(enumerator.list_position_ids(owner()).await.is_err());
    }

    #[tokio::test]
    async fn balance_failure_is_an_error() {
        let (enumerator, _mock) = enumerator();
        assert!(enumerator.list_position_ids(owner()).await.is_err());
    }

    #[tokio::test]
    async fn position_record_keeps_negative_ticks() {
        let (enumerator, mock) = enumerator();
        let token0 = Address::from_low_u64_be(0x1001);
        let token1 = Address::from_low_u64_be(0x1002);
        let record = encode(&[
            AbiToken::Uint(U256::zero()),
            AbiToken::Address(Address::zero()),
            AbiToken::Address(token0),
            AbiToken::Address(token1),
            AbiToken::Uint(U256::from(3000u64)),
            AbiToken::Int(I256::from(-600).into_raw()),
            AbiToken::Int(I256::from(-60).into_raw()),
            AbiToken::Uint(U256::from(987_654_321u64)),
            AbiToken::Uint(U256::zero()),
            AbiToken::Uint(U256::zero()),
            AbiToken::Uint(U256::zero()),
            AbiToken::Uint(U256::zero()),
        ]);
        queue(&mock, vec![Bytes::from(record)]);

        let position = enumerator.position(U256::from(42u64)).await.unwrap();
        assert_eq!(
            position,
            OnChainPosition {
                token_id: U256::from(42u64),
                token0,
                token1,
                fee: 3000,
                tick_lower: -600,
                tick_upper: -60,
                liquidity: 987_654_321,
            }
        );
    }
}
