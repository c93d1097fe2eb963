//! # Position Aggregation
//!
//! Turns an owner address into the list of its collateral-eligible liquidity
//! positions, each with token amounts computed against the pool's current
//! state.
//!
//! ## Per-position flow
//!
//! ```text
//! positions(id) -> getPool + slot0/liquidity -> eligibility -> token metadata -> amounts
//! ```
//!
//! Every position runs this flow concurrently with its siblings. A failure at
//! any step excludes only that position and is reported as an [`Exclusion`];
//! the only error that reaches the caller is a failure to enumerate the
//! owner's positions in the first place.
//!
//! ## Example
//!
//! ```rust,ignore
//! let network = Settings::new()?.network_config()?;
//! let pipeline = PositionPipeline::on_chain(provider, &network);
//! for position in pipeline.aggregate("0x...").await? {
//!     println!("{} {} / {}", position.token_id, position.amount0, position.amount1);
//! }
//! ```

use crate::chain::{OnChainSource, PositionSource};
use crate::eligibility::{is_eligible, AllowList};
use crate::error::Exclusion;
use crate::settings::{AllowListMode, NetworkConfig};
use crate::types::conversions::{format_units, string_to_address};
use crate::types::{OnChainPosition, Position};
use crate::v3_math::compute_amounts;
use anyhow::{Context, Result};
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;

/// Where eligibility decisions come from.
#[derive(Debug, Clone)]
pub enum AllowListSource {
    /// Fixed list loaded from configuration
    Static(Arc<AllowList>),
    /// `supportedAssets(token)` asked for each position's pair
    OnChain,
}

impl AllowListSource {
    pub fn from_network(network: &NetworkConfig) -> Self {
        match network.allow_list_mode {
            AllowListMode::OnChain => AllowListSource::OnChain,
            AllowListMode::Static => AllowListSource::Static(network.supported_assets.clone()),
        }
    }
}

/// Outcome of one aggregation: included positions and the reasons the rest were dropped.
///
/// Both lists are sorted by token id.
#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    pub included: Vec<Position>,
    pub excluded: Vec<(U256, Exclusion)>,
}

pub struct PositionPipeline<S: PositionSource> {
    source: Arc<S>,
    allow_list: AllowListSource,
}

impl<M: Middleware + 'static> PositionPipeline<OnChainSource<M>> {
    /// Pipeline reading from `provider` with the contracts and allow-list mode of `network`.
    pub fn on_chain(provider: Arc<M>, network: &NetworkConfig) -> Self {
        Self::new(
            Arc::new(OnChainSource::new(provider, network)),
            AllowListSource::from_network(network),
        )
    }
}

impl<S: PositionSource> PositionPipeline<S> {
    pub fn new(source: Arc<S>, allow_list: AllowListSource) -> Self {
        Self { source, allow_list }
    }

    /// Eligible positions of `owner`, sorted by token id.
    ///
    /// A malformed or empty owner yields an empty list.
    pub async fn aggregate(&self, owner: &str) -> Result<Vec<Position>> {
        Ok(self.aggregate_report(owner).await?.included)
    }

    /// Like [`PositionPipeline::aggregate`], also returning every exclusion.
    pub async fn aggregate_report(&self, owner: &str) -> Result<AggregationReport> {
        match string_to_address(owner) {
            Ok(owner) => self.aggregate_for(owner).await,
            Err(e) => {
                debug!("Not aggregating: {}", e);
                Ok(AggregationReport::default())
            }
        }
    }

    pub async fn aggregate_for(&self, owner: Address) -> Result<AggregationReport> {
        if owner.is_zero() {
            return Ok(AggregationReport::default());
        }

        let ids = self
            .source
            .list_position_ids(owner)
            .await
            .with_context(|| format!("Failed to enumerate positions of {:?}", owner))?;

        if ids.is_empty() {
            info!("No positions for {:?}", owner);
            return Ok(AggregationReport::default());
        }

        let outcomes = join_all(ids.iter().map(|&token_id| async move {
            (token_id, self.evaluate(token_id).await)
        }))
        .await;

        let mut report = AggregationReport::default();
        for (token_id, outcome) in outcomes {
            match outcome {
                Ok(position) => report.included.push(position),
                Err(reason) => {
                    if reason.is_expected() {
                        debug!("Position {} excluded: {}", token_id, reason);
                    } else {
                        warn!("Position {} excluded: {}", token_id, reason);
                    }
                    report.excluded.push((token_id, reason));
                }
            }
        }

        report.included.sort_by_key(|p| p.token_id);
        report.excluded.sort_by_key(|(token_id, _)| *token_id);

        info!(
            "Owner {:?}: {} of {} positions included",
            owner,
            report.included.len(),
            ids.len()
        );
        Ok(report)
    }

    /// Runs the full flow for one position.
    pub async fn evaluate(&self, token_id: U256) -> Result<Position, Exclusion> {
        let record = self
            .source
            .position(token_id)
            .await
            .map_err(|e| Exclusion::PositionRead(format!("{:#}", e)))?;

        let lookup = self
            .source
            .pool_state(record.token0, record.token1, record.fee)
            .await
            .map_err(|e| Exclusion::PoolRead(format!("{:#}", e)))?;
        let state = *lookup.state().ok_or(Exclusion::PoolNotFound {
            token0: record.token0,
            token1: record.token1,
            fee: record.fee,
        })?;

        self.check_eligibility(&record).await?;

        let tokens = self.source.tokens(&[record.token0, record.token1]).await;
        let token0 = tokens
            .get(&record.token0)
            .cloned()
            .ok_or(Exclusion::TokenMetadata(record.token0))?;
        let token1 = tokens
            .get(&record.token1)
            .cloned()
            .ok_or(Exclusion::TokenMetadata(record.token1))?;

        let (amount0, amount1) =
            compute_amounts(&state, record.liquidity, record.tick_lower, record.tick_upper)?;

        Ok(Position {
            token_id,
            amount0: format_units(amount0, token0.decimals),
            amount1: format_units(amount1, token1.decimals),
            token0,
            token1,
            fee: record.fee,
            liquidity: record.liquidity,
            tick_lower: record.tick_lower,
            tick_upper: record.tick_upper,
        })
    }

    async fn check_eligibility(&self, record: &OnChainPosition) -> Result<(), Exclusion> {
        let eligible = match &self.allow_list {
            AllowListSource::Static(list) => is_eligible(record.token0, record.token1, list),
            AllowListSource::OnChain => {
                let list = self
                    .source
                    .supported_assets(&[record.token0, record.token1])
                    .await
                    .map_err(|e| Exclusion::AllowList(format!("{:#}", e)))?;
                is_eligible(record.token0, record.token1, &list)
            }
        };

        if eligible {
            Ok(())
        } else {
            Err(Exclusion::Ineligible {
                token0: record.token0,
                token1: record.token1,
            })
        }
    }
}
