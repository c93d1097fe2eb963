//! Integration tests for configuration loading
//!
//! Tests cover:
//! - TOML loading with defaults
//! - Env-style overrides
//! - Validation in `network_config()`

use ethers::types::Address;
use lp_collateral_sdk::settings::{AllowListMode, Settings, ENV_PRICE_FEEDS, ENV_RPC_URL, ENV_SUPPORTED_ASSETS};
use std::io::Write;
use std::str::FromStr;

const WETH: &str = "0x4200000000000000000000000000000000000006";
const USDC: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";
const WETH_FEED: &str = "0x71041dddad3595F9CEd3DcCFBe3D1F4b0a16Bb70";

const MINIMAL: &str = r#"
[rpc]
http_url = "http://localhost:8545"

[contracts]
position_manager = "0x03a520b32C04BF3bEEf7BEb72E919cf822Ed34f1"
uniswap_v3_factory = "0x33128a8fC17869897dcE68Ed026d694621f6FDfD"
options_platform = "0x025662f089E993f3B51c07C43fc50ea92239A6dA"
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn load(contents: &str) -> Settings {
    let file = write_config(contents);
    Settings::from_file(file.path()).unwrap()
}

fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

#[test]
fn minimal_file_gets_defaults() {
    let settings = load(MINIMAL);
    assert_eq!(settings.rpc.chain_id, 8453);
    assert_eq!(settings.multicall.batch_size, 100);
    assert_eq!(settings.eligibility.mode, AllowListMode::OnChain);
    assert!(settings.price_feeds.oracles.is_empty());

    let network = settings.network_config().unwrap();
    assert_eq!(
        network.multicall,
        addr("0xcA11bde05977b3631167028862bE2a173976CA11")
    );
    assert_eq!(
        network.position_manager,
        addr("0x03a520b32C04BF3bEEf7BEb72E919cf822Ed34f1")
    );
    assert!(network.supported_assets.is_empty());
}

#[test]
fn full_file_is_parsed() {
    let contents = format!(
        r#"{MINIMAL}
[multicall]
batch_size = 50

[price_feeds.oracles]
"{WETH}" = "{WETH_FEED}"
"{USDC}" = "not-a-feed"

[eligibility]
mode = "static"
supported_assets = ["{WETH}", "0x833589FCD6EDB6E08F4C7C32D4F71B54BDA02913"]
"#
    );
    let network = load(&contents).network_config().unwrap();

    assert_eq!(network.multicall_batch_size, 50);
    assert_eq!(network.allow_list_mode, AllowListMode::Static);
    // invalid feed entries are skipped
    assert_eq!(network.price_feeds.len(), 1);
    assert_eq!(network.price_feeds.get(&addr(WETH)), Some(&addr(WETH_FEED)));
    assert_eq!(network.supported_assets.len(), 2);
    assert!(network.supported_assets.contains(&addr(USDC)));
}

#[test]
fn overrides_replace_file_values() {
    let mut settings = load(MINIMAL);
    let feeds = format!(r#"{{"{}": "{}"}}"#, WETH, WETH_FEED);
    let assets = format!("{}, {}", WETH, USDC);
    settings.apply_overrides(|key| match key {
        ENV_RPC_URL => Some(" https://rpc.example ".to_string()),
        ENV_PRICE_FEEDS => Some(feeds.clone()),
        ENV_SUPPORTED_ASSETS => Some(assets.clone()),
        _ => None,
    });

    assert_eq!(settings.rpc.http_url, "https://rpc.example");
    assert_eq!(settings.eligibility.supported_assets.len(), 2);

    let network = settings.network_config().unwrap();
    assert_eq!(network.price_feeds.get(&addr(WETH)), Some(&addr(WETH_FEED)));
    assert!(network.supported_assets.contains(&addr(WETH)));
}

#[test]
fn blank_or_malformed_overrides_are_ignored() {
    let mut settings = load(MINIMAL);
    settings.apply_overrides(|key| match key {
        ENV_RPC_URL => Some("   ".to_string()),
        ENV_PRICE_FEEDS => Some("{not json".to_string()),
        ENV_SUPPORTED_ASSETS => Some("".to_string()),
        _ => None,
    });

    assert_eq!(settings.rpc.http_url, "http://localhost:8545");
    assert!(settings.price_feeds.oracles.is_empty());
    assert!(settings.eligibility.supported_assets.is_empty());
}

#[test]
fn invalid_contract_address_is_rejected() {
    let contents = MINIMAL.replace(
        "0x33128a8fC17869897dcE68Ed026d694621f6FDfD",
        "0x33128a8f",
    );
    let err = load(&contents).network_config().unwrap_err();
    assert!(err.to_string().contains("uniswap_v3_factory"));
}

#[test]
fn missing_required_section_fails_to_load() {
    let file = write_config("[rpc]\nhttp_url = \"http://localhost:8545\"\n");
    assert!(Settings::from_file(file.path()).is_err());
}

#[test]
fn shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Config.toml");
    let network = Settings::from_file(path).unwrap().network_config().unwrap();
    assert_eq!(network.chain_id, 8453);
    assert_eq!(network.price_feeds.len(), 2);
}
