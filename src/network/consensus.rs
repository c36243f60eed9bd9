use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, Ledger, is_valid_chain};
use crate::error::{LedgerError, PeerError};

/// Body of `GET /chain`, the whole node-to-node wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Where candidate chains come from.
pub trait ChainSource {
    fn fetch_chain(&self, peer: &str)
    -> impl Future<Output = Result<ChainSnapshot, PeerError>>;
}

/// Fetches `<peer>/chain` over HTTP with a bounded timeout.
#[derive(Clone)]
pub struct HttpChainSource {
    client: Client,
}

impl HttpChainSource {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl ChainSource for HttpChainSource {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
        let resp = self.client.get(format!("{peer}/chain")).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }
        Ok(resp.json::<ChainSnapshot>().await?)
    }
}

/// A peer chain that beat the local one.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Poll every peer and return the longest valid chain strictly longer than
/// `local_len`. Unreachable or misbehaving peers are skipped. Peers are
/// visited in the given order and only a strictly longer chain displaces the
/// current best, so ties go to the earliest peer.
pub async fn best_candidate<S: ChainSource>(
    source: &S,
    peers: &[String],
    local_len: usize,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    let mut max_len = local_len;

    for peer in peers {
        let snapshot = match source.fetch_chain(peer).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("CONSENSUS - skipping peer {peer}: {e}");
                continue;
            }
        };
        if snapshot.length != snapshot.chain.len() {
            let e = PeerError::LengthMismatch {
                reported: snapshot.length,
                actual: snapshot.chain.len(),
            };
            warn!("CONSENSUS - skipping peer {peer}: {e}");
            continue;
        }
        if snapshot.length <= max_len {
            debug!(
                "CONSENSUS - peer {peer} has {} blocks, best so far {max_len}",
                snapshot.length
            );
            continue;
        }
        if !is_valid_chain(&snapshot.chain) {
            warn!(
                "CONSENSUS - peer {peer} offered an invalid chain of {} blocks",
                snapshot.length
            );
            continue;
        }

        max_len = snapshot.length;
        best = Some(Candidate {
            peer: peer.clone(),
            chain: snapshot.chain,
        });
    }
    best
}

/// Install `candidate` if it is still longer than the local chain.
/// Returns whether the chain was replaced.
pub fn adopt(ledger: &mut Ledger, candidate: Candidate) -> Result<bool, LedgerError> {
    if candidate.chain.len() <= ledger.len() {
        info!(
            "CONSENSUS - chain from {} no longer longer than local ({} <= {})",
            candidate.peer,
            candidate.chain.len(),
            ledger.len()
        );
        return Ok(false);
    }
    info!(
        "CONSENSUS - adopting {} blocks from {}",
        candidate.chain.len(),
        candidate.peer
    );
    ledger.replace_chain(candidate.chain)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ChainSnapshot, ChainSource, adopt, best_candidate};
    use crate::blockchain::{Block, Ledger};
    use crate::error::PeerError;
    use crate::store::MemoryStore;

    /// Peers answering from a fixed table; unknown peers are unreachable.
    #[derive(Default)]
    struct FakePeers {
        chains: HashMap<String, ChainSnapshot>,
    }

    impl FakePeers {
        fn with(mut self, peer: &str, chain: Vec<Block>) -> Self {
            let length = chain.len();
            self.chains
                .insert(peer.to_string(), ChainSnapshot { chain, length });
            self
        }
    }

    impl ChainSource for FakePeers {
        async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
            self.chains
                .get(peer)
                .cloned()
                .ok_or(PeerError::Status(503))
        }
    }

    fn ledger_with_len(len: usize, miner: &str) -> Ledger {
        let mut ledger = Ledger::open(Box::new(MemoryStore::new())).unwrap();
        while ledger.len() < len {
            ledger.mine(miner, None).unwrap();
        }
        ledger
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[actix_web::test]
    async fn longer_valid_chain_replaces_local() {
        let mut a = ledger_with_len(3, "node-a");
        let b = ledger_with_len(5, "node-b");
        let source = FakePeers::default().with("http://b:5000", b.chain().to_vec());

        let candidate = best_candidate(&source, &peers(&["http://b:5000"]), a.len())
            .await
            .unwrap();
        assert!(adopt(&mut a, candidate).unwrap());
        assert_eq!(a.len(), 5);
        assert_eq!(a.chain(), b.chain());
    }

    #[actix_web::test]
    async fn shorter_or_equal_chains_are_ignored() {
        let a = ledger_with_len(3, "node-a");
        let source = FakePeers::default()
            .with("http://b:5000", ledger_with_len(2, "b").chain().to_vec())
            .with("http://c:5000", ledger_with_len(3, "c").chain().to_vec());
        let found = best_candidate(&source, &peers(&["http://b:5000", "http://c:5000"]), a.len()).await;
        assert!(found.is_none());
    }

    #[actix_web::test]
    async fn invalid_and_unreachable_peers_are_skipped() {
        let mut forged = ledger_with_len(4, "forger").chain().to_vec();
        forged[2].previous_hash = "00".into();
        let good = ledger_with_len(3, "good").chain().to_vec();
        let source = FakePeers::default()
            .with("http://forged:1", forged)
            .with("http://good:1", good.clone());

        let found = best_candidate(
            &source,
            &peers(&["http://down:1", "http://forged:1", "http://good:1"]),
            1,
        )
        .await
        .unwrap();
        assert_eq!(found.peer, "http://good:1");
        assert_eq!(found.chain, good);
    }

    #[actix_web::test]
    async fn misreported_length_is_skipped() {
        let mut source = FakePeers::default();
        let chain = ledger_with_len(2, "liar").chain().to_vec();
        source.chains.insert(
            "http://liar:1".into(),
            ChainSnapshot { chain, length: 9 },
        );
        assert!(best_candidate(&source, &peers(&["http://liar:1"]), 1).await.is_none());
    }

    #[actix_web::test]
    async fn ties_go_to_first_peer() {
        let first = ledger_with_len(3, "x").chain().to_vec();
        let second = ledger_with_len(3, "y").chain().to_vec();
        let source = FakePeers::default()
            .with("http://a:1", first.clone())
            .with("http://b:1", second);
        let found = best_candidate(&source, &peers(&["http://a:1", "http://b:1"]), 1)
            .await
            .unwrap();
        assert_eq!(found.peer, "http://a:1");
        assert_eq!(found.chain, first);
    }

    #[actix_web::test]
    async fn adopt_rechecks_length_at_swap_time() {
        let mut a = ledger_with_len(2, "a");
        let b = ledger_with_len(3, "b");
        let source = FakePeers::default().with("http://b:1", b.chain().to_vec());
        let candidate = best_candidate(&source, &peers(&["http://b:1"]), a.len())
            .await
            .unwrap();

        // Local chain grew while peers were being polled.
        a.mine("a", None).unwrap();
        a.mine("a", None).unwrap();
        let before = a.chain().to_vec();
        assert!(!adopt(&mut a, candidate).unwrap());
        assert_eq!(a.chain(), before.as_slice());
    }
}
