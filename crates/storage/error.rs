use ethereum_types::{Address, H256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account {0:#x} not found")]
    AccountNotFound(Address),
    #[error("No code stored for hash {0:#x}")]
    CodeNotFound(H256),
    #[error("Snapshot {0} not found or already consumed")]
    SnapshotNotFound(u64),
    #[error("Invalid address {0:#x} for delegation")]
    InvalidAddress(Address),
    /// Reserved for static call contexts.
    #[error("Write attempted in a read-only context")]
    WriteProtection,
}
