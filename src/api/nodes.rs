use actix_web::{HttpResponse, get, post, web};
use log::info;

use super::error::ApiError;
use super::models::{AppState, NodesResponse, RegisterNodesRequest, ResolveResponse};
use crate::network::{adopt, best_candidate, registry::normalize_address};

/// Register peers by URL or bare `host:port`.
#[post("/nodes/register")]
pub async fn register_nodes(
    state: web::Data<AppState>,
    body: web::Json<RegisterNodesRequest>,
) -> Result<HttpResponse, ApiError> {
    let RegisterNodesRequest { nodes } = body.into_inner();
    if nodes.is_empty() {
        return Err(ApiError::BadRequest(
            "Please supply a non-empty list of node URLs in 'nodes'.".into(),
        ));
    }
    // Reject the whole batch before touching the registry.
    for node in &nodes {
        normalize_address(node)?;
    }

    let mut registry = state.nodes()?;
    for node in &nodes {
        let normalized = registry.register(node)?;
        info!("NODES - registered {normalized}");
    }
    Ok(HttpResponse::Created().json(NodesResponse {
        message: Some("New nodes have been added"),
        total_nodes: registry.nodes(),
    }))
}

/// List registered peers.
#[get("/nodes")]
pub async fn list_nodes(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(NodesResponse {
        message: None,
        total_nodes: state.nodes()?.nodes(),
    }))
}

/// Longest-valid-chain consensus. Peers are polled without holding the
/// ledger lock; the lock is taken only for the final swap.
#[get("/nodes/resolve")]
pub async fn resolve_conflicts(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let peers = state.nodes()?.nodes();
    let local_len = AppState::with_ledger(&state, |ledger, _| Ok(ledger.len())).await?;

    let candidate = best_candidate(&state.peers, &peers, local_len).await;
    let resp = AppState::with_ledger(&state, move |ledger, _| {
        let replaced = match candidate {
            Some(candidate) => adopt(ledger, candidate)?,
            None => false,
        };
        let chain = ledger.chain().to_vec();
        Ok(if replaced {
            ResolveResponse {
                message: "Our chain was replaced",
                new_chain: Some(chain),
                chain: None,
            }
        } else {
            ResolveResponse {
                message: "Our chain is authoritative",
                new_chain: None,
                chain: Some(chain),
            }
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}
