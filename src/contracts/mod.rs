// Contracts Module - read-only ABIs for every contract the SDK queries

pub mod aggregator_v3_interface;
pub mod erc20;
pub mod i_uniswap_v3_factory;
pub mod i_uniswap_v3_pool;
pub mod nonfungible_position_manager;
pub mod options_platform;

pub use aggregator_v3_interface::AggregatorV3Interface;
pub use erc20::Erc20;
pub use i_uniswap_v3_factory::IUniswapV3Factory;
pub use i_uniswap_v3_pool::IUniswapV3Pool;
pub use nonfungible_position_manager::NonfungiblePositionManager;
pub use options_platform::OptionsPlatform;
