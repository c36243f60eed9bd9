use std::time::Instant;

use log::{debug, info, warn};
use serde_json::Number;

use super::{Block, is_valid_chain, pow};
use crate::error::LedgerError;
use crate::store::BlockStore;
use crate::transaction::Transaction;

/// The node's chain and pending pool, shadowed by a durable [`BlockStore`].
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    store: Box<dyn BlockStore>,
}

impl Ledger {
    /// Rehydrate from `store`, or create and persist the genesis block when the
    /// store is empty.
    pub fn open(mut store: Box<dyn BlockStore>) -> Result<Self, LedgerError> {
        let chain = store.load_all()?;
        if !chain.is_empty() && !is_valid_chain(&chain) {
            return Err(LedgerError::InvalidStoredChain {
                length: chain.len(),
            });
        }

        let mut ledger = Self {
            chain,
            pending: Vec::new(),
            store,
        };
        if ledger.chain.is_empty() {
            let genesis = ledger.mint_genesis()?;
            info!("LEDGER - fresh node, created genesis block #{}", genesis.index);
        } else {
            info!(
                "LEDGER - restored {} blocks from store (head #{})",
                ledger.chain.len(),
                ledger.head()?.index
            );
        }
        Ok(ledger)
    }

    /// Queue a transaction for the next block; returns that block's index.
    pub fn record_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Number>,
    ) -> u64 {
        self.pending.push(Transaction::new(sender, recipient, amount));
        self.next_index()
    }

    /// Seal the whole pending pool into a new block with `proof`.
    ///
    /// `previous_hash` defaults to the hash of the current head. The block is
    /// persisted before it is appended; on a store failure neither the chain
    /// nor the pending pool change.
    pub fn mint_block(
        &mut self,
        proof: u64,
        previous_hash: Option<String>,
    ) -> Result<&Block, LedgerError> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.head()?.hash(),
        };
        let block = Block::new(self.next_index(), self.pending.clone(), proof, previous_hash);

        self.store.save(&block)?;
        self.pending.clear();
        self.chain.push(block);
        self.head()
    }

    /// Mining flow: solve against the head proof, add the reward for `miner`
    /// and mint. Gives up with [`LedgerError::MiningTimedOut`] after `deadline`.
    pub fn mine(&mut self, miner: &str, deadline: Option<Instant>) -> Result<&Block, LedgerError> {
        let last_proof = self.head()?.proof;
        let started = Instant::now();
        let proof = match deadline {
            None => pow::solve(last_proof),
            Some(_) => pow::search(last_proof, 0, deadline).ok_or(LedgerError::MiningTimedOut)?,
        };
        debug!(
            "MINER - proof {} found for last_proof {} in {} ms",
            proof,
            last_proof,
            started.elapsed().as_millis()
        );

        let reward = Transaction::reward(miner);
        self.record_transaction(reward.sender, reward.recipient, reward.amount);
        if let Err(e) = self.mint_block(proof, None).map(|_| ()) {
            // Drop the reward so a retry does not pay it twice.
            self.pending.pop();
            return Err(e);
        }
        self.head()
    }

    /// Swap in a chain adopted from a peer and rewrite the store to match.
    /// The pending pool is kept.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), LedgerError> {
        if chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        self.store.replace_all(&chain)?;
        info!(
            "LEDGER - chain replaced: {} -> {} blocks",
            self.chain.len(),
            chain.len()
        );
        self.chain = chain;
        Ok(())
    }

    pub fn head(&self) -> Result<&Block, LedgerError> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_valid(&self) -> bool {
        let valid = is_valid_chain(&self.chain);
        if !valid {
            warn!("LEDGER - local chain failed validation");
        }
        valid
    }

    fn next_index(&self) -> u64 {
        self.chain.last().map_or(1, |b| b.index + 1)
    }

    fn mint_genesis(&mut self) -> Result<&Block, LedgerError> {
        let genesis = Block::genesis(std::mem::take(&mut self.pending));
        if let Err(e) = self.store.save(&genesis) {
            self.pending = genesis.transactions;
            return Err(e.into());
        }
        self.chain.push(genesis);
        self.head()
    }
}

#[cfg(test)]
mod tests {
    use super::Ledger;
    use crate::blockchain::{Block, is_valid_chain, pow};
    use crate::error::{LedgerError, StoreError};
    use crate::store::{BlockStore, MemoryStore};
    use crate::transaction::Transaction;

    /// Store whose writes always fail.
    struct BrokenStore;

    impl BlockStore for BrokenStore {
        fn save(&mut self, block: &Block) -> Result<(), StoreError> {
            Err(StoreError::Corrupt {
                index: block.index,
                reason: "disk full".into(),
            })
        }
        fn load_all(&mut self) -> Result<Vec<Block>, StoreError> {
            Ok(Vec::new())
        }
        fn replace_all(&mut self, _chain: &[Block]) -> Result<(), StoreError> {
            Err(StoreError::Corrupt {
                index: 0,
                reason: "disk full".into(),
            })
        }
    }

    fn fresh() -> (Ledger, MemoryStore) {
        let store = MemoryStore::new();
        let ledger = Ledger::open(Box::new(store.clone())).unwrap();
        (ledger, store)
    }

    #[test]
    fn fresh_ledger_persists_genesis() {
        let (ledger, store) = fresh();
        assert_eq!(ledger.len(), 1);
        let genesis = ledger.head().unwrap();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, 100);
        assert_eq!(genesis.previous_hash, "1");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn restart_reuses_stored_chain() {
        let (mut ledger, store) = fresh();
        ledger.mine("node", None).unwrap();
        let before = ledger.chain().to_vec();

        let reopened = Ledger::open(Box::new(store.clone())).unwrap();
        assert_eq!(reopened.chain(), before.as_slice());
        assert_eq!(store.len(), 2);
        assert!(reopened.is_valid());
    }

    #[test]
    fn tampered_store_is_rejected() {
        let (mut ledger, store) = fresh();
        ledger.mine("node", None).unwrap();
        let mut chain = ledger.chain().to_vec();
        chain[1].previous_hash = "bogus".into();
        let mut writer = store.clone();
        writer.replace_all(&chain).unwrap();

        assert!(matches!(
            Ledger::open(Box::new(store)),
            Err(LedgerError::InvalidStoredChain { length: 2 })
        ));
    }

    #[test]
    fn record_transaction_reports_next_index() {
        let (mut ledger, _) = fresh();
        assert_eq!(ledger.record_transaction("a", "b", 5), 2);
        assert_eq!(ledger.record_transaction("c", "d", 2), 2);
        assert_eq!(ledger.pending().len(), 2);
    }

    #[test]
    fn minting_consumes_pending_pool_in_order() {
        let (mut ledger, _) = fresh();
        ledger.record_transaction("a", "b", 5);
        ledger.record_transaction("c", "d", 2);
        let expected = ledger.pending().to_vec();

        let proof = pow::solve(ledger.head().unwrap().proof);
        let block = ledger.mint_block(proof, None).unwrap().clone();
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions, expected);
        assert!(ledger.pending().is_empty());
        assert_eq!(block.previous_hash, ledger.chain()[0].hash());
    }

    #[test]
    fn mine_appends_reward_after_pending() {
        let (mut ledger, store) = fresh();
        ledger.record_transaction("a", "b", 5);
        let block = ledger.mine("node-id", None).unwrap().clone();

        assert_eq!(block.index, 2);
        assert_eq!(
            block.transactions,
            vec![Transaction::new("a", "b", 5), Transaction::reward("node-id")]
        );
        assert!(pow::valid_proof(100, block.proof));
        assert!(is_valid_chain(ledger.chain()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn mine_times_out_without_touching_pool() {
        let (mut ledger, _) = fresh();
        ledger.record_transaction("a", "b", 5);
        let past = std::time::Instant::now() - std::time::Duration::from_secs(1);
        assert!(matches!(
            ledger.mine("node", Some(past)),
            Err(LedgerError::MiningTimedOut)
        ));
        assert_eq!(ledger.pending().len(), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn persistence_failure_fails_open() {
        assert!(matches!(
            Ledger::open(Box::new(BrokenStore)),
            Err(LedgerError::Store(_))
        ));
    }

    #[test]
    fn persistence_failure_leaves_state_untouched() {
        let (mut ledger, _) = fresh();
        ledger.store = Box::new(BrokenStore);
        ledger.record_transaction("a", "b", 5);

        assert!(matches!(ledger.mine("node", None), Err(LedgerError::Store(_))));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending(), &[Transaction::new("a", "b", 5)]);
    }

    #[test]
    fn replace_chain_rewrites_store() {
        let (mut ledger, store) = fresh();
        let (mut other, _) = fresh();
        other.mine("peer", None).unwrap();
        other.mine("peer", None).unwrap();

        ledger.replace_chain(other.chain().to_vec()).unwrap();
        assert_eq!(ledger.chain(), other.chain());
        assert_eq!(store.len(), 3);
        assert!(matches!(
            ledger.replace_chain(Vec::new()),
            Err(LedgerError::EmptyChain)
        ));
    }
}
