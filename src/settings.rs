use crate::eligibility::AllowList;
use crate::types::conversions::string_to_address;
use anyhow::{Context, Result};
use config::{Config, ConfigError, File};
use ethers::types::Address;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Env var overriding `rpc.http_url`.
pub const ENV_RPC_URL: &str = "LPC_RPC_URL";
/// Env var with a JSON object `{ token_address: feed_address }` merged into `price_feeds.oracles`.
pub const ENV_PRICE_FEEDS: &str = "LPC_PRICE_FEEDS";
/// Env var replacing `eligibility.supported_assets` (JSON array or comma separated).
pub const ENV_SUPPORTED_ASSETS: &str = "LPC_SUPPORTED_ASSETS";

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    pub http_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    8453 // Base
}

#[derive(Debug, Deserialize, Clone)]
pub struct Contracts {
    #[serde(default = "default_multicall_address")]
    pub multicall: String,
    pub position_manager: String,
    pub uniswap_v3_factory: String,
    pub options_platform: String,
}

fn default_multicall_address() -> String {
    // Multicall3, same address on every EVM chain
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MulticallSettings {
    #[serde(default = "default_multicall_batch_size")]
    pub batch_size: usize,
}

fn default_multicall_batch_size() -> usize {
    100
}

impl Default for MulticallSettings {
    fn default() -> Self {
        Self {
            batch_size: default_multicall_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PriceFeeds {
    /// token address -> Chainlink aggregator address
    #[serde(default)]
    pub oracles: HashMap<String, String>,
}

/// Where the collateral allow-list comes from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllowListMode {
    /// Ask the options platform's `supportedAssets(token)` for every pair
    #[default]
    OnChain,
    /// Use `eligibility.supported_assets` as-is
    Static,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Eligibility {
    #[serde(default)]
    pub mode: AllowListMode,
    #[serde(default)]
    pub supported_assets: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: Rpc,
    pub contracts: Contracts,
    #[serde(default)]
    pub multicall: MulticallSettings,
    #[serde(default)]
    pub price_feeds: PriceFeeds,
    #[serde(default)]
    pub eligibility: Eligibility,
}

impl Settings {
    /// Loads `Config.toml` from the working directory and applies `LPC_*` env overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("Config.toml")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Applies overrides from `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.rpc.http_url = trimmed.to_string();
            }
        }

        if let Some(raw_feeds) = lookup(ENV_PRICE_FEEDS) {
            let trimmed = raw_feeds.trim();
            if !trimmed.is_empty() {
                match serde_json::from_str::<HashMap<String, String>>(trimmed) {
                    Ok(map) => {
                        for (token, feed) in map {
                            // address validation happens in network_config()
                            if !token.trim().is_empty() && !feed.trim().is_empty() {
                                self.price_feeds.oracles.insert(token, feed);
                            }
                        }
                    }
                    Err(e) => warn!("Failed to parse {} as JSON: {}", ENV_PRICE_FEEDS, e),
                }
            }
        }

        if let Some(raw_assets) = lookup(ENV_SUPPORTED_ASSETS) {
            if let Some(list) = parse_string_list(&raw_assets) {
                if !list.is_empty() {
                    self.eligibility.supported_assets = list;
                }
            }
        }
    }

    /// Parses every address once into the immutable config the pipeline runs on.
    ///
    /// Contract addresses must be valid. Malformed price-feed entries and
    /// allow-list entries are skipped with a warning.
    pub fn network_config(&self) -> Result<NetworkConfig> {
        let contract = |name: &str, raw: &str| -> Result<Address> {
            string_to_address(raw).with_context(|| format!("contracts.{} is not a valid address", name))
        };

        let mut price_feeds = HashMap::with_capacity(self.price_feeds.oracles.len());
        for (token, feed) in &self.price_feeds.oracles {
            match (string_to_address(token), string_to_address(feed)) {
                (Ok(t), Ok(f)) => {
                    price_feeds.insert(t, f);
                }
                _ => warn!("Skipping invalid price feed entry {} -> {}", token, feed),
            }
        }

        Ok(NetworkConfig {
            chain_id: self.rpc.chain_id,
            multicall: contract("multicall", &self.contracts.multicall)?,
            position_manager: contract("position_manager", &self.contracts.position_manager)?,
            uniswap_v3_factory: contract("uniswap_v3_factory", &self.contracts.uniswap_v3_factory)?,
            options_platform: contract("options_platform", &self.contracts.options_platform)?,
            multicall_batch_size: self.multicall.batch_size,
            price_feeds: Arc::new(price_feeds),
            allow_list_mode: self.eligibility.mode,
            supported_assets: Arc::new(AllowList::from_strs(&self.eligibility.supported_assets)),
        })
    }
}

/// Validated, read-only network configuration shared by every reader.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub multicall: Address,
    pub position_manager: Address,
    pub uniswap_v3_factory: Address,
    pub options_platform: Address,
    pub multicall_batch_size: usize,
    pub price_feeds: Arc<HashMap<Address, Address>>,
    pub allow_list_mode: AllowListMode,
    pub supported_assets: Arc<AllowList>,
}

fn parse_string_list(input: &str) -> Option<Vec<String>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(vec![]);
    }

    if let Ok(v) = serde_json::from_str::<Vec<String>>(trimmed) {
        return Some(v);
    }

    // Shell-quoted env values often lose their inner quotes (`[0xa, 0xb]`),
    // which is no longer JSON; read those as a plain comma list.
    let body = trimmed
        .strip_prefix('[')
        .map(|rest| rest.strip_suffix(']').unwrap_or(rest))
        .unwrap_or(trimmed);
    Some(split_list(body))
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
