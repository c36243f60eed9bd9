use thiserror::Error;

/// Failures of the durable block store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored block #{index} is malformed: {reason}")]
    Corrupt { index: u64, reason: String },
}

/// Failures of ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("chain has no blocks")]
    EmptyChain,
    #[error("failed to persist chain: {0}")]
    Store(#[from] StoreError),
    #[error("proof-of-work search exceeded its time limit")]
    MiningTimedOut,
    #[error("persisted chain failed validation ({length} blocks)")]
    InvalidStoredChain { length: usize },
}

/// Reasons a peer is skipped during conflict resolution.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("peer reported length {reported} for a chain of {actual} blocks")]
    LengthMismatch { reported: usize, actual: usize },
}

/// Rejected peer addresses.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid node address '{0}'")]
    InvalidAddress(String),
}
