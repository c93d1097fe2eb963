//! # Position Scanner
//!
//! Prints the collateral-eligible Uniswap V3 positions of a wallet as JSON.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --bin position_scanner -- --owner 0xYourWallet
//! cargo run --bin position_scanner -- --owner 0xYourWallet --config Config.toml --report
//! ```
//!
//! `LPC_RPC_URL`, `LPC_PRICE_FEEDS` and `LPC_SUPPORTED_ASSETS` (also read from
//! `.env`) override the config file.

use anyhow::{Context, Result};
use clap::Parser;
use ethers::prelude::{Http, Provider};
use log::info;
use lp_collateral_sdk::pipeline::PositionPipeline;
use lp_collateral_sdk::settings::{AllowListMode, Settings};
use lp_collateral_sdk::types::conversions::address_to_string;
use lp_collateral_sdk::v3_math::tick_to_price;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "position_scanner")]
#[command(about = "List a wallet's collateral-eligible Uniswap V3 positions", long_about = None)]
struct Args {
    /// Wallet whose positions are listed
    #[arg(short, long)]
    owner: String,

    /// Configuration file
    #[arg(short, long, default_value = "Config.toml")]
    config: PathBuf,

    /// Ask the options platform for supported assets instead of using the configured list
    #[arg(long)]
    onchain_allow_list: bool,

    /// Also print excluded positions and why they were dropped
    #[arg(short, long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut settings = Settings::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if args.onchain_allow_list {
        settings.eligibility.mode = AllowListMode::OnChain;
    }
    let network = settings.network_config()?;
    info!(
        "Chain {} | position manager {} | allow-list {:?}",
        network.chain_id,
        address_to_string(network.position_manager),
        network.allow_list_mode
    );

    let provider = Provider::<Http>::try_from(settings.rpc.http_url.as_str())
        .with_context(|| format!("Invalid RPC URL {}", settings.rpc.http_url))?;
    let pipeline = PositionPipeline::on_chain(Arc::new(provider), &network);

    let report = pipeline.aggregate_report(&args.owner).await?;

    for position in &report.included {
        info!(
            "#{} {}/{} fee={} range [{:.6}, {:.6}] usd={}",
            position.token_id,
            position.token0.symbol,
            position.token1.symbol,
            position.fee,
            tick_to_price(position.tick_lower),
            tick_to_price(position.tick_upper),
            position
                .usd_value()
                .map(|v| v.round_dp(2).to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    let output = if args.report {
        let excluded: Vec<_> = report
            .excluded
            .iter()
            .map(|(token_id, reason)| {
                json!({
                    "tokenId": token_id.to_string(),
                    "reason": reason.to_string(),
                })
            })
            .collect();
        json!({
            "included": report.included,
            "excluded": excluded,
        })
    } else {
        serde_json::to_value(&report.included)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
