use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::BlockStore;
use crate::blockchain::Block;
use crate::error::StoreError;

/// Non-durable store keyed by block index. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blocks: Arc<Mutex<BTreeMap<u64, Block>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks().len()
    }

    fn blocks(&self) -> MutexGuard<'_, BTreeMap<u64, Block>> {
        self.blocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BlockStore for MemoryStore {
    fn save(&mut self, block: &Block) -> Result<(), StoreError> {
        self.blocks().insert(block.index, block.clone());
        Ok(())
    }

    fn load_all(&mut self) -> Result<Vec<Block>, StoreError> {
        Ok(self.blocks().values().cloned().collect())
    }

    fn replace_all(&mut self, chain: &[Block]) -> Result<(), StoreError> {
        let mut blocks = self.blocks();
        blocks.clear();
        blocks.extend(chain.iter().map(|b| (b.index, b.clone())));
        Ok(())
    }
}
