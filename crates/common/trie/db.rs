use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::TrieError;

/// Storage backend for trie nodes, keyed by the node's canonical hash.
pub trait TrieDB: Send + Sync {
    fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError>;
    fn put_batch(&self, key_values: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), TrieError>;
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TrieError> {
        self.put_batch(vec![(key, value)])
    }
}

/// [`TrieDB`] over a shared map, used for scratch tries and tests.
pub struct InMemoryTrieDB {
    inner: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl InMemoryTrieDB {
    pub const fn new(map: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>) -> Self {
        Self { inner: map }
    }

    pub fn new_empty() -> Self {
        Self::new(Arc::default())
    }

    fn locked(&self) -> Result<MutexGuard<'_, HashMap<Vec<u8>, Vec<u8>>>, TrieError> {
        self.inner.lock().map_err(|_| TrieError::LockError)
    }
}

impl TrieDB for InMemoryTrieDB {
    fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError> {
        Ok(self.locked()?.get(&key).cloned())
    }

    fn put_batch(&self, key_values: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), TrieError> {
        let mut store = self.locked()?;
        for (key, value) in key_values {
            store.insert(key, value);
        }
        Ok(())
    }
}
