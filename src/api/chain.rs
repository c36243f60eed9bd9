use std::time::Instant;

use actix_web::{HttpResponse, get, post, web};
use log::{error, info};

use super::error::ApiError;
use super::models::{
    AppState, ChainResponse, MinedBlockResponse, NewTransactionRequest, ValidateResponse,
};
use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Get the full blockchain.
#[get("/chain")]
pub async fn get_chain(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let resp = AppState::with_ledger(&state, |ledger, _| {
        Ok(ChainResponse {
            chain: ledger.chain().to_vec(),
            length: ledger.len(),
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Validate the local chain.
#[get("/validate")]
pub async fn validate_chain(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let resp = AppState::with_ledger(&state, |ledger, _| {
        Ok(ValidateResponse {
            valid: ledger.is_valid(),
            length: ledger.len(),
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Record a transaction and immediately mine the block that carries it.
#[post("/transactions/new")]
pub async fn new_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTransactionRequest>,
) -> Result<HttpResponse, ApiError> {
    let tx = Transaction::from(body.into_inner());
    let block = mine_on_worker(&state, Some(tx)).await?;
    Ok(HttpResponse::Created().json(MinedBlockResponse::new(
        "Transaction stored and block mined",
        block,
        &state.node_id,
    )))
}

/// Mine a block from whatever is pending (possibly only the reward).
#[get("/mine")]
pub async fn mine(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let block = mine_on_worker(&state, None).await?;
    Ok(HttpResponse::Ok().json(MinedBlockResponse::new(
        "New Block Forged",
        block,
        &state.node_id,
    )))
}

/// Run record -> proof-of-work -> reward -> mint -> persist holding the
/// ledger lock for the whole sequence.
async fn mine_on_worker(
    state: &web::Data<AppState>,
    tx: Option<Transaction>,
) -> Result<Block, ApiError> {
    let deadline = state.mining_timeout.map(|limit| Instant::now() + limit);
    let started = Instant::now();

    let block = AppState::with_ledger(state, move |ledger, state| {
        if let Some(tx) = tx {
            let index = ledger.record_transaction(tx.sender, tx.recipient, tx.amount);
            info!("TX - queued for block #{index}");
        }
        Ok(ledger.mine(&state.node_id, deadline)?.clone())
    })
    .await
    .inspect_err(|e| error!("MINER - mining failed: {e}"))?;

    info!(
        "MINER - sealed block #{} (proof={}, txs={}, {} ms)",
        block.index,
        block.proof,
        block.transactions.len(),
        started.elapsed().as_millis()
    );
    Ok(block)
}
