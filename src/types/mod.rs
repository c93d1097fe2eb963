pub mod conversions;
pub mod pool;
pub mod position;
pub mod token;

pub use pool::{PoolLookup, PoolState};
pub use position::{OnChainPosition, Position};
pub use token::{OracleReading, Token};
