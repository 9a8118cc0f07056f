use statecraft_rlp::error::RLPDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
    #[error("node referenced by the trie is missing from the state")]
    InconsistentTree,
    #[error("compact-encoded path is empty")]
    InvalidPath,
    #[error("odd number of nibbles cannot form whole bytes")]
    InvalidKey,
    #[error("trie node store lock was poisoned")]
    LockError,
    #[error("trie node store failure: {0}")]
    DbError(anyhow::Error),
}
