use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::transaction::Transaction;

/// A single block of the ledger. Field names are the wire/JSON names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64, // seconds since the Unix epoch (UTC)
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// Create a block stamped with the current time.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            timestamp: now_secs(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Create the genesis block (first block in the chain).
    pub fn genesis(transactions: Vec<Transaction>) -> Self {
        Self::new(
            1,
            transactions,
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// Canonical JSON form used for hashing: keys sorted at every level,
    /// compact separators. Independent of struct field order.
    pub fn canonical_json(&self) -> String {
        let transactions = self
            .transactions
            .iter()
            .map(|tx| {
                sorted_object([
                    ("amount", Value::Number(tx.amount.clone())),
                    ("recipient", Value::from(tx.recipient.as_str())),
                    ("sender", Value::from(tx.sender.as_str())),
                ])
            })
            .collect::<Vec<_>>();

        sorted_object([
            ("index", Value::from(self.index)),
            ("previous_hash", Value::from(self.previous_hash.as_str())),
            ("proof", Value::from(self.proof)),
            ("timestamp", Value::from(self.timestamp)),
            ("transactions", Value::Array(transactions)),
        ])
        .to_string()
    }

    /// Lowercase hex SHA-256 of the canonical JSON form.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json().as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn sorted_object<const N: usize>(mut fields: [(&str, Value); N]) -> Value {
    fields.sort_by(|a, b| a.0.cmp(b.0));
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
