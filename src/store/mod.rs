pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::blockchain::Block;
use crate::error::StoreError;

/// Durable shadow copy of the chain.
///
/// `save` must be synchronous and safe to retry for the same block index.
/// `load_all` returns blocks ordered by index, each with its transactions in
/// insertion order.
pub trait BlockStore: Send {
    fn save(&mut self, block: &Block) -> Result<(), StoreError>;
    fn load_all(&mut self) -> Result<Vec<Block>, StoreError>;
    /// Rewrite the whole record so it matches `chain` exactly.
    fn replace_all(&mut self, chain: &[Block]) -> Result<(), StoreError>;
}
