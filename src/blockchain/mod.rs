pub mod block;
pub mod model;
pub mod pow;
pub mod validate;

pub use block::Block;
pub use model::Ledger;
pub use validate::is_valid_chain;

/// Required hex prefix of `sha256("{last_proof}{proof}")` (4 zero nibbles).
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// Sentinel `previous_hash` of the genesis block (not a real digest).
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Sender of system-minted reward transactions.
pub const REWARD_SENDER: &str = "0";

/// Amount paid to the miner of every block.
pub const MINING_REWARD: u64 = 1;
