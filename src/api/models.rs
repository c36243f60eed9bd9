use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use actix_web::web;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::error::ApiError;
use crate::blockchain::{Block, Ledger};
use crate::network::{HttpChainSource, NodeRegistry};
use crate::transaction::Transaction;

/// Shared application state: the ledger and the peer registry, each behind
/// its own lock.
pub struct AppState {
    /// Identity of this node; recipient of mining rewards.
    pub node_id: String,
    pub ledger: Mutex<Ledger>,
    pub nodes: Mutex<NodeRegistry>,
    pub peers: HttpChainSource,
    pub mining_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        node_id: String,
        ledger: Ledger,
        peers: HttpChainSource,
        mining_timeout: Option<Duration>,
    ) -> Self {
        Self {
            node_id,
            ledger: Mutex::new(ledger),
            nodes: Mutex::new(NodeRegistry::new()),
            peers,
            mining_timeout,
        }
    }

    pub fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, ApiError> {
        self.ledger.lock().map_err(|_| ApiError::Poisoned("ledger"))
    }

    /// Run `f` with the ledger locked, on the blocking pool. Mining holds the
    /// lock for a whole proof-of-work search, so the lock is never awaited on
    /// an HTTP worker thread.
    pub async fn with_ledger<T, F>(state: &web::Data<AppState>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Ledger, &AppState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let state = state.clone();
        web::block(move || {
            let mut ledger = state.ledger()?;
            f(&mut *ledger, state.get_ref())
        })
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
    }

    pub fn nodes(&self) -> Result<MutexGuard<'_, NodeRegistry>, ApiError> {
        self.nodes.lock().map_err(|_| ApiError::Poisoned("node registry"))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

/* ---------- Mining / TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: Number,
}

impl From<NewTransactionRequest> for Transaction {
    fn from(req: NewTransactionRequest) -> Self {
        Transaction::new(req.sender, req.recipient, req.amount)
    }
}

#[derive(Serialize)]
pub struct MinedBlockResponse {
    pub message: &'static str,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
    pub miner: String,
}

impl MinedBlockResponse {
    pub fn new(message: &'static str, block: Block, miner: &str) -> Self {
        Self {
            message,
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
            miner: miner.to_string(),
        }
    }
}

/* ---------- Node API Models ---------- */

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct NodesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chain: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<Block>>,
}
