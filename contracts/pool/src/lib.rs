//! Shielded pool state machine
//!
//! The on-chain half of the pool: the commitment accumulator, the nullifier
//! set, token custody, governance-controlled limits and the receiving side of
//! the bridge relay.

pub mod bridge;
pub mod config;
pub mod merkle_with_history;
pub mod pool;

pub use bridge::{PAYLOAD_MAGIC, PAYLOAD_VERSION, decode_bridge_payload, encode_for_bridge};
pub use config::{ConfigError, Limits, PoolConfig, parse_units};
pub use merkle_with_history::MerkleTreeWithHistory;
pub use pool::{Account, CrossChainOrigin, Error, Pool};
