//! Collateral eligibility: a position qualifies only when both of its tokens
//! are supported assets of the options platform.

use crate::contracts::OptionsPlatform;
use crate::multicall::{Call, Multicall};
use crate::types::conversions::string_to_address;
use anyhow::Result;
use ethers::providers::Middleware;
use ethers::types::Address;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable set of supported collateral assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    assets: HashSet<Address>,
}

impl AllowList {
    pub fn new(assets: impl IntoIterator<Item = Address>) -> Self {
        Self {
            assets: assets.into_iter().collect(),
        }
    }

    /// Builds the list from address strings in any letter case; malformed entries are dropped.
    pub fn from_strs<S: AsRef<str>>(raw: &[S]) -> Self {
        let assets = raw
            .iter()
            .filter_map(|s| match string_to_address(s.as_ref()) {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!("Ignoring allow-list entry: {}", e);
                    None
                }
            })
            .collect();
        Self { assets }
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.assets.contains(token)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// True only if both tokens are in the allow-list.
pub fn is_eligible(token0: Address, token1: Address, allow_list: &AllowList) -> bool {
    allow_list.contains(&token0) && allow_list.contains(&token1)
}

/// Reads `supportedAssets(token)` from the options platform.
#[derive(Debug, Clone)]
pub struct SupportedAssets<M: Middleware> {
    provider: Arc<M>,
    multicall: Arc<Multicall<M>>,
    platform: Address,
}

impl<M: Middleware + 'static> SupportedAssets<M> {
    pub fn new(provider: Arc<M>, multicall: Arc<Multicall<M>>, platform: Address) -> Self {
        Self {
            provider,
            multicall,
            platform,
        }
    }

    /// Builds an allow-list holding the candidates the platform reports as supported.
    ///
    /// A candidate whose individual read reverts or fails to decode is treated
    /// as unsupported; a failure of the batch itself is returned.
    pub async fn load(&self, candidates: &[Address]) -> Result<AllowList> {
        if candidates.is_empty() {
            return Ok(AllowList::default());
        }

        let platform = OptionsPlatform::new(self.platform, self.provider.clone());
        let supported_fn = platform.abi().function("supportedAssets")?;

        let mut calls = Vec::with_capacity(candidates.len());
        for token in candidates {
            let call_data = supported_fn.encode_input(&[ethers::abi::Token::Address(*token)])?;
            calls.push(Call::new(self.platform, call_data));
        }

        let results = self.multicall.run(calls, None).await?;

        let mut supported = HashSet::new();
        for (token, raw) in candidates.iter().zip(results) {
            let flag = raw
                .and_then(|bytes| supported_fn.decode_output(&bytes).ok())
                .and_then(|tokens| tokens.into_iter().next())
                .and_then(|t| t.into_bool())
                .unwrap_or(false);
            debug!("supportedAssets({:?}) = {}", token, flag);
            if flag {
                supported.insert(*token);
            }
        }

        Ok(AllowList { assets: supported })
    }
}
