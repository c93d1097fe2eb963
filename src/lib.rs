//! # LP Collateral SDK
//!
//! Reads a wallet's Uniswap V3 liquidity positions, keeps the ones whose two
//! tokens are supported collateral on the options platform, and computes the
//! underlying token amounts and their USD prices.
//!
//! ## Overview
//!
//! The SDK is a point-in-time read-and-compute pipeline. Nothing is cached
//! between calls and nothing is written on chain.
//!
//! - **Enumeration**: position ids of an owner from the NonfungiblePositionManager
//! - **Pool state**: factory lookup plus `slot0` / `liquidity`, read in one batch
//! - **Eligibility**: both tokens must be in the supported-asset allow-list
//! - **Valuation**: exact TickMath / SqrtPriceMath amounts, ERC-20 metadata and oracle prices
//!
//! ## Architecture
//!
//! ### Chain Layer
//! Typed contract bindings (`contracts`) and a Multicall3 `aggregate3`
//! executor (`multicall`) that every reader shares. `chain::PositionSource`
//! is the seam between the readers and the pipeline.
//!
//! ### Math Layer
//! `v3_math` is pure and deterministic: same inputs, same amounts.
//!
//! ### Pipeline Layer
//! `pipeline::PositionPipeline` runs every position concurrently and reports
//! exclusions per position instead of failing the whole call.

// Core Types
/// Common types and data structures
pub mod types;
/// Domain and per-position error types
pub mod error;
/// Configuration loading
pub mod settings;

// Chain Layer
/// Contract bindings
pub mod contracts;
/// Multicall3 batching
pub mod multicall;
/// Chain access seam and its on-chain implementation
pub mod chain;
/// ERC-20 metadata and oracle prices
pub mod token_resolver;
/// Position ids and records of an owner
pub mod position_enumerator;
/// Pool lookup and state reads
pub mod pool_state;
/// Balances, allowances and NFT approvals
pub mod account;

// Math & Filtering
/// Uniswap V3 tick and liquidity math
pub mod v3_math;
/// Supported-asset allow-list
pub mod eligibility;

// Orchestration
/// Per-owner position aggregation
pub mod pipeline;

pub use chain::{OnChainSource, PositionSource};
pub use eligibility::{is_eligible, AllowList};
pub use error::{Exclusion, SdkError};
pub use pipeline::{AggregationReport, AllowListSource, PositionPipeline};
pub use settings::{NetworkConfig, Settings};
pub use types::{OnChainPosition, PoolLookup, PoolState, Position, Token};
