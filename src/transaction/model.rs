use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::blockchain::{MINING_REWARD, REWARD_SENDER};

/// A value transfer between two parties. Immutable once embedded in a block.
///
/// `amount` keeps the JSON number exactly as submitted, so `5` stays `5` and
/// `5.0` stays `5.0` in responses and in the block hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: Number,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Number>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }

    /// System-minted block reward paid to `miner`.
    pub fn reward(miner: impl Into<String>) -> Self {
        Self::new(REWARD_SENDER, miner, MINING_REWARD)
    }
}
