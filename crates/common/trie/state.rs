use std::collections::HashMap;

use statecraft_rlp::encode::RLPEncode;

use crate::error::TrieError;

use super::db::TrieDB;
use super::{node::Node, node_hash::NodeHash};

/// Node store backing a trie: hash-addressed access to encoded nodes, with a
/// write-back cache in front of the DB. Nodes are only ever added, never
/// deleted, so stale siblings of committed nodes simply stay behind.
pub struct TrieState {
    db: Box<dyn TrieDB>,
    cache: HashMap<NodeHash, Node>,
}

impl TrieState {
    pub fn new(db: Box<dyn TrieDB>) -> TrieState {
        TrieState {
            db,
            cache: HashMap::new(),
        }
    }

    /// Resolves a node reference, trying inline encodings, the cache and the
    /// DB in that order.
    pub fn get_node(&self, hash: NodeHash) -> Result<Option<Node>, TrieError> {
        // An inline reference carries the whole node
        if let NodeHash::Inline(ref encoded) = hash {
            return Ok(Some(Node::decode_raw(encoded)?));
        }
        if let Some(cached) = self.cache.get(&hash) {
            return Ok(Some(cached.clone()));
        }
        let Some(rlp) = self.db.get(hash.into())? else {
            return Ok(None);
        };
        Ok(Some(Node::decode_raw(&rlp)?))
    }

    /// Caches a node under its reference. An inline reference already holds
    /// the node inside its parent's encoding, so there is nothing to store.
    pub fn insert_node(&mut self, node: Node, hash: NodeHash) {
        if let NodeHash::Hashed(_) = hash {
            self.cache.insert(hash, node);
        }
    }

    /// Flushes the cached nodes reachable from `root` to the DB, then drops
    /// the whole cache. Cached nodes off the root's trie are discarded.
    pub fn commit(&mut self, root: &NodeHash) -> Result<(), TrieError> {
        let mut batch = Vec::new();
        let mut pending = vec![root.clone()];

        while let Some(hash) = pending.pop() {
            // Not cached means already persisted
            let Some(node) = self.cache.remove(&hash) else {
                continue;
            };
            let encoded = node.encode_to_vec();
            match node {
                Node::Branch(branch) => {
                    pending.extend(branch.choices.into_iter().filter(NodeHash::is_valid));
                }
                Node::Extension(extension) => pending.push(extension.child),
                Node::Leaf(_) => {}
            }
            batch.push((hash.into(), encoded));
        }

        self.cache.clear();
        self.db.put_batch(batch)
    }
}
