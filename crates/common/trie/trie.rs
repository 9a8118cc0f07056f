pub mod db;
pub mod error;
mod nibbles;
mod node;
mod node_hash;
mod rlp;
mod state;

use ethereum_types::H256;
use lazy_static::lazy_static;
use sha3::{Digest, Keccak256};
use statecraft_rlp::constants::RLP_NULL;

pub use self::db::{InMemoryTrieDB, TrieDB};
pub use self::error::TrieError;
pub use self::nibbles::Nibbles;
pub use self::node::Node;
pub use self::node_hash::NodeHash;
pub use self::state::TrieState;

use self::node::LeafNode;

lazy_static! {
    /// Root hash of a trie holding nothing: the keccak digest of the null RLP string.
    pub static ref EMPTY_TRIE_HASH: H256 = H256(Keccak256::digest([RLP_NULL]).into());
}

/// Key bytes addressing a value in the trie.
pub type PathRLP = Vec<u8>;
/// RLP-encoded value bytes stored in the trie.
pub type ValueRLP = Vec<u8>;

/// Merkle Patricia Trie over arbitrary byte keys, backed by a pluggable
/// node store.
pub struct Trie {
    /// Reference to the current root node, if the trie holds anything.
    root: Option<NodeHash>,
    /// Node storage, caching unhashed changes on top of the DB.
    pub(crate) state: TrieState,
}

impl Trie {
    /// Creates an empty trie on top of a clean node store.
    pub fn new(db: Box<dyn TrieDB>) -> Self {
        Self {
            root: None,
            state: TrieState::new(db),
        }
    }

    /// Opens a trie whose nodes were previously committed under `root`.
    pub fn open(db: Box<dyn TrieDB>, root: H256) -> Self {
        let mut trie = Self::new(db);
        if root != *EMPTY_TRIE_HASH {
            trie.root = Some(root.into());
        }
        trie
    }

    /// Creates a trie over a fresh in-memory store.
    pub fn new_temp() -> Self {
        Self::new(Box::new(InMemoryTrieDB::new_empty()))
    }

    /// Looks up the value stored under `path`.
    pub fn get(&self, path: &PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let root_node = self
            .state
            .get_node(root.clone())?
            .ok_or(TrieError::InconsistentTree)?;
        root_node.get(&self.state, Nibbles::from_bytes(path))
    }

    /// Stores `value` under `path`, overwriting any previous value.
    pub fn insert(&mut self, path: PathRLP, value: ValueRLP) -> Result<(), TrieError> {
        let path = Nibbles::from_bytes(&path);
        let new_root = match self.root.take() {
            Some(root) => {
                let root_node = self
                    .state
                    .get_node(root)?
                    .ok_or(TrieError::InconsistentTree)?;
                root_node.insert(&mut self.state, path, value)?
            }
            None => LeafNode::new(path, value).into(),
        };
        self.root = Some(new_root.insert_self(&mut self.state)?);
        Ok(())
    }

    /// Removes the value under `path`, returning it if it was present.
    pub fn remove(&mut self, path: PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        let Some(root) = self.root.take() else {
            return Ok(None);
        };
        let root_node = self
            .state
            .get_node(root)?
            .ok_or(TrieError::InconsistentTree)?;
        let (new_root, old_value) =
            root_node.remove(&mut self.state, Nibbles::from_bytes(&path))?;
        if let Some(node) = new_root {
            self.root = Some(node.insert_self(&mut self.state)?);
        }
        Ok(old_value)
    }

    /// Root hash of the current contents, or `None` for an empty trie.
    /// The root node is always digested, even when its encoding is short
    /// enough that a parent would inline it.
    pub fn root_hash(&self) -> Option<H256> {
        self.root.as_ref().map(NodeHash::finalize)
    }

    /// Root hash, with the empty-trie hash standing in when nothing is stored.
    pub fn hash_no_commit(&self) -> H256 {
        self.root_hash().unwrap_or(*EMPTY_TRIE_HASH)
    }

    /// Flushes pending nodes to the DB, then returns the root hash.
    pub fn hash(&mut self) -> Result<H256, TrieError> {
        self.commit()?;
        Ok(self.hash_no_commit())
    }

    /// Writes every cached node reachable from the root out to the DB.
    pub fn commit(&mut self) -> Result<(), TrieError> {
        match &self.root {
            Some(root) => self.state.commit(root),
            None => Ok(()),
        }
    }

    /// Hashes the given entries as a trie without keeping any of its nodes.
    pub fn compute_hash_from_unsorted_iter(
        iter: impl IntoIterator<Item = (PathRLP, ValueRLP)>,
    ) -> H256 {
        let mut trie = Self::new(Box::new(SinkDB));
        for (path, value) in iter {
            // Inserting into a SinkDB-backed trie only ever touches the cache
            #[allow(clippy::unwrap_used)]
            trie.insert(path, value).unwrap();
        }
        trie.hash_no_commit()
    }
}

/// Node store that reads and persists nothing, for hash-only tries.
struct SinkDB;

impl TrieDB for SinkDB {
    fn get(&self, _key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError> {
        Ok(None)
    }

    fn put_batch(&self, _key_values: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), TrieError> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::Arc;

    use cita_trie::{MemoryDB as CitaMemoryDB, PatriciaTrie as CitaTrie, Trie as CitaTrieTrait};
    use hasher::HasherKeccak;
    use hex_literal::hex;
    use proptest::collection::{btree_set, vec};
    use proptest::prelude::*;
    use proptest::proptest;

    /// Inserts every entry, then checks each one reads back.
    fn roundtrip(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Trie {
        let mut trie = Trie::new_temp();
        for (path, value) in &entries {
            trie.insert(path.clone(), value.clone()).unwrap();
        }
        for (path, value) in &entries {
            assert_eq!(trie.get(path).unwrap(), Some(value.clone()));
        }
        trie
    }

    fn reference_trie() -> CitaTrie<CitaMemoryDB, HasherKeccak> {
        CitaTrie::new(
            Arc::new(CitaMemoryDB::new(true)),
            Arc::new(HasherKeccak::new()),
        )
    }

    #[test]
    fn lookups_after_plain_inserts() {
        let trie = roundtrip(vec![
            (b"first".to_vec(), b"value_a".to_vec()),
            (b"second".to_vec(), b"value_b".to_vec()),
        ]);
        assert!(trie.get(&b"third".to_vec()).unwrap().is_none());
    }

    #[test]
    fn keys_that_prefix_other_keys() {
        roundtrip(vec![
            (vec![16], vec![0]),
            (vec![16, 0], vec![1]),
        ]);
        roundtrip(vec![
            (vec![0x00], vec![0x00]),
            (vec![0xc8], vec![0xc8]),
            (vec![0xc8, 0x00], vec![0xc8, 0x00]),
        ]);
    }

    #[test]
    fn keys_sharing_nibble_prefixes() {
        roundtrip(vec![
            (vec![0x00], vec![0x00]),
            (vec![0x01], vec![0x01]),
            (vec![0x10], vec![0x10]),
            (vec![0x19], vec![0x19]),
            (vec![0x19, 0x00], vec![0x19, 0x00]),
            (vec![0x1a], vec![0x1a]),
        ]);
    }

    #[test]
    fn mixed_length_binary_keys() {
        roundtrip(vec![
            (vec![7, 115, 226], vec![1]),
            (vec![9, 51, 204, 0, 73], vec![2]),
            (vec![144, 38], vec![3]),
            (vec![255, 38, 255, 250, 91, 129, 8], vec![4]),
            (vec![2, 196, 85, 171], vec![5]),
            (vec![33], vec![6]),
            (vec![33, 7], vec![7]),
            (vec![33, 7, 190, 4], vec![8]),
            (vec![190], vec![9]),
            (vec![190, 33], vec![10]),
        ]);
    }

    #[test]
    fn empty_key_stores_a_value() {
        let mut trie = Trie::new_temp();
        trie.insert(vec![], b"root".to_vec()).unwrap();
        trie.insert(vec![0x01], b"one".to_vec()).unwrap();
        assert_eq!(trie.get(&vec![]).unwrap(), Some(b"root".to_vec()));
        assert_eq!(trie.remove(vec![]).unwrap(), Some(b"root".to_vec()));
        assert!(trie.get(&vec![]).unwrap().is_none());
        assert_eq!(trie.get(&vec![0x01]).unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn removals_leave_siblings_intact() {
        let mut trie = roundtrip(vec![
            (b"do".to_vec(), b"verb".to_vec()),
            (b"horse".to_vec(), b"stallion".to_vec()),
            (b"doge".to_vec(), b"coin".to_vec()),
        ]);
        assert_eq!(
            trie.remove(b"horse".to_vec()).unwrap(),
            Some(b"stallion".to_vec())
        );
        assert_eq!(trie.get(&b"do".to_vec()).unwrap(), Some(b"verb".to_vec()));
        assert_eq!(trie.get(&b"doge".to_vec()).unwrap(), Some(b"coin".to_vec()));

        let mut trie = roundtrip(vec![
            (vec![185], vec![185]),
            (vec![185, 0], vec![185, 0]),
            (vec![185, 1], vec![185, 1]),
        ]);
        trie.remove(vec![185, 1]).unwrap();
        assert_eq!(trie.get(&vec![185, 0]).unwrap(), Some(vec![185, 0]));
        assert_eq!(trie.get(&vec![185]).unwrap(), Some(vec![185]));
        assert!(trie.get(&vec![185, 1]).unwrap().is_none());
    }

    #[test]
    fn remove_branch_value_child() {
        let mut trie = Trie::new_temp();
        trie.insert(vec![0x0a], b"parent".to_vec()).unwrap();
        trie.insert(vec![0x0a, 0x01], b"child".to_vec()).unwrap();
        assert_eq!(
            trie.remove(vec![0x0a, 0x01]).unwrap(),
            Some(b"child".to_vec())
        );
        assert_eq!(trie.get(&vec![0x0a]).unwrap(), Some(b"parent".to_vec()));
    }

    #[test]
    fn remove_absent_key() {
        let mut trie = Trie::new_temp();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        let before = trie.hash().unwrap();
        assert_eq!(trie.remove(b"cat".to_vec()).unwrap(), None);
        assert_eq!(trie.hash().unwrap(), before);
    }

    #[test]
    fn remove_restores_prior_root() {
        let mut trie = Trie::new_temp();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        let before = trie.hash().unwrap();

        trie.insert(b"horse".to_vec(), b"stallion".to_vec())
            .unwrap();
        assert_eq!(
            trie.remove(b"horse".to_vec()).unwrap(),
            Some(b"stallion".to_vec())
        );

        assert_eq!(trie.hash().unwrap(), before);
    }

    #[test]
    fn known_root_hashes() {
        // Roots cross-checked against reference Patricia trie implementations.
        let cases = vec![
            (
                vec![
                    (b"first".to_vec(), b"value".to_vec()),
                    (b"second".to_vec(), b"value".to_vec()),
                ],
                hex!("f7537e7f4b313c426440b7fface6bff76f51b3eb0d127356efbe6f2b3c891501"),
            ),
            (
                vec![
                    (b"first".to_vec(), b"value".to_vec()),
                    (b"second".to_vec(), b"value".to_vec()),
                    (b"third".to_vec(), b"value".to_vec()),
                    (b"fourth".to_vec(), b"value".to_vec()),
                ],
                hex!("e2ff76eca34a96b68e6871c74f2a5d9db58e59f82073276866fdd25e560cedea"),
            ),
            (
                vec![
                    (b"do".to_vec(), b"verb".to_vec()),
                    (b"horse".to_vec(), b"stallion".to_vec()),
                    (b"doge".to_vec(), b"coin".to_vec()),
                    (b"dog".to_vec(), b"puppy".to_vec()),
                ],
                hex!("5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84"),
            ),
            (
                vec![
                    (
                        b"key1aa".to_vec(),
                        b"0123456789012345678901234567890123456789xxx".to_vec(),
                    ),
                    (
                        b"key1".to_vec(),
                        b"0123456789012345678901234567890123456789Very_Long".to_vec(),
                    ),
                    (b"key2bb".to_vec(), b"aval3".to_vec()),
                    (b"key2".to_vec(), b"short".to_vec()),
                    (b"key3cc".to_vec(), b"aval3".to_vec()),
                    (b"key3".to_vec(), b"1234567890123456789012345678901".to_vec()),
                ],
                hex!("cb65032e2f76c48b82b5c24b3db8f670ce73982869d38cd39a624f23d62a9e89"),
            ),
            (
                vec![
                    (b"abc".to_vec(), b"123".to_vec()),
                    (b"abcd".to_vec(), b"abcd".to_vec()),
                    (b"abc".to_vec(), b"abc".to_vec()),
                ],
                hex!("7a320748f780ad9ad5b0837302075ce0eeba6c26e3d8562c67ccc0f1b273298a"),
            ),
        ];

        for (entries, expected) in cases {
            let mut trie = Trie::new_temp();
            for (path, value) in entries {
                trie.insert(path, value).unwrap();
            }
            assert_eq!(trie.hash().unwrap(), H256(expected));
        }
    }

    #[test]
    fn known_root_hash_for_state_shaped_keys() {
        let entries = [
            (
                hex!("0000000000000000000000000000000000000000000000000000000000000045").to_vec(),
                hex!("22b224a1420a802ab51d326e29fa98e34c4f24ea").to_vec(),
            ),
            (
                hex!("0000000000000000000000000000000000000000000000000000000000000046").to_vec(),
                hex!("67706c2076330000000000000000000000000000000000000000000000000000").to_vec(),
            ),
            (
                hex!("000000000000000000000000697c7b8c961b56f675d570498424ac8de1a918f6").to_vec(),
                hex!("1234567890").to_vec(),
            ),
            (
                hex!("0000000000000000000000007ef9e639e2733cb34e4dfc576d4b23f72db776b2").to_vec(),
                hex!("4655474156000000000000000000000000000000000000000000000000000000").to_vec(),
            ),
            (
                hex!("000000000000000000000000ec4f34c97e43fbb2816cfd95e388353c7181dab1").to_vec(),
                hex!("4e616d6552656700000000000000000000000000000000000000000000000000").to_vec(),
            ),
            (
                hex!("4655474156000000000000000000000000000000000000000000000000000000").to_vec(),
                hex!("7ef9e639e2733cb34e4dfc576d4b23f72db776b2").to_vec(),
            ),
            (
                hex!("4e616d6552656700000000000000000000000000000000000000000000000000").to_vec(),
                hex!("ec4f34c97e43fbb2816cfd95e388353c7181dab1").to_vec(),
            ),
            (
                hex!("000000000000000000000000697c7b8c961b56f675d570498424ac8de1a918f6").to_vec(),
                hex!("6f6f6f6820736f2067726561742c207265616c6c6c793f000000000000000000").to_vec(),
            ),
            (
                hex!("6f6f6f6820736f2067726561742c207265616c6c6c793f000000000000000000").to_vec(),
                hex!("697c7b8c961b56f675d570498424ac8de1a918f6").to_vec(),
            ),
        ];

        let mut trie = Trie::new_temp();
        for (path, value) in entries {
            trie.insert(path, value).unwrap();
        }
        assert_eq!(
            trie.hash().unwrap(),
            H256(hex!(
                "9f6221ebb8efe7cff60a716ecb886e67dd042014be444669f0159d8e68b42100"
            ))
        );
    }

    #[test]
    fn empty_trie_hashes_to_the_null_rlp_digest() {
        let mut trie = Trie::new_temp();
        assert!(trie.root_hash().is_none());
        assert_eq!(trie.hash().unwrap(), *EMPTY_TRIE_HASH);
        assert_eq!(
            EMPTY_TRIE_HASH.0,
            hex!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
        );
    }

    #[test]
    fn root_hash_digests_short_root() {
        let mut trie = Trie::new_temp();
        trie.insert(vec![0x01], vec![0x02]).unwrap();
        // The root node encoding is shorter than 32 bytes but must still be hashed
        assert_eq!(trie.root_hash(), Some(trie.hash_no_commit()));
    }

    #[test]
    fn compute_hash_insertion_order() {
        let data = [
            (vec![0x01, 0x02], b"chain".to_vec()),
            (vec![0x01, 0x03], b"fork".to_vec()),
            (vec![0x02, 0x00], b"stale".to_vec()),
        ];
        let mut pruned = Trie::new_temp();
        for (path, value) in &data[..2] {
            pruned.insert(path.clone(), value.clone()).unwrap();
        }
        let pruned_root = pruned.hash_no_commit();

        let mut hashes = Vec::new();
        for perm in [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ] {
            let mut trie = Trie::new_temp();
            for i in perm {
                let (path, value) = &data[i];
                trie.insert(path.clone(), value.clone()).unwrap();
            }
            hashes.push(trie.hash_no_commit());

            // Removing the third key lands every permutation on the root of
            // a trie built fresh from the other two.
            trie.remove(vec![0x02, 0x00]).unwrap();
            assert_eq!(trie.hash_no_commit(), pruned_root);
        }
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
        assert_ne!(hashes[0], *EMPTY_TRIE_HASH);
    }

    #[test]
    fn compute_hash_from_unsorted_iter_matches_tree() {
        let data = [
            (b"doe".to_vec(), b"reindeer".to_vec()),
            (b"dog".to_vec(), b"puppy".to_vec()),
            (b"dogglesworth".to_vec(), b"cat".to_vec()),
        ];
        let mut trie = Trie::new_temp();
        for (path, value) in data.iter() {
            trie.insert(path.clone(), value.clone()).unwrap();
        }
        assert_eq!(
            Trie::compute_hash_from_unsorted_iter(data),
            trie.hash().unwrap()
        );
    }

    #[test]
    fn open_resumes_committed_trie() {
        let map = Arc::new(std::sync::Mutex::new(std::collections::HashMap::new()));
        let mut trie = Trie::new(Box::new(InMemoryTrieDB::new(Arc::clone(&map))));
        trie.insert(b"first".to_vec(), b"value_a".to_vec()).unwrap();
        trie.insert(b"second".to_vec(), b"value_b".to_vec())
            .unwrap();
        let root = trie.hash().unwrap();

        let reopened = Trie::open(Box::new(InMemoryTrieDB::new(map)), root);
        assert_eq!(
            reopened.get(&b"first".to_vec()).unwrap(),
            Some(b"value_a".to_vec())
        );
        assert_eq!(
            reopened.get(&b"second".to_vec()).unwrap(),
            Some(b"value_b".to_vec())
        );
    }

    proptest! {
        #[test]
        fn arbitrary_keys_read_back(entries in btree_set(vec(any::<u8>(), 1..100), 1..100)) {
            let mut trie = Trie::new_temp();
            for key in entries.iter() {
                trie.insert(key.clone(), key.clone()).unwrap();
            }
            for key in entries.iter() {
                prop_assert_eq!(trie.get(key).unwrap(), Some(key.clone()));
            }
        }

        #[test]
        fn removed_keys_stay_gone(entries in btree_set(vec(any::<u8>(), 5..100), 1..100)) {
            // Keys with an even first byte survive, the rest get removed.
            let keep = |key: &Vec<u8>| key.first().is_none_or(|b| b % 2 == 0);
            let mut trie = Trie::new_temp();
            for key in entries.iter() {
                trie.insert(key.clone(), key.clone()).unwrap();
            }
            for key in entries.iter().filter(|key| !keep(key)) {
                prop_assert_eq!(trie.remove(key.clone()).unwrap(), Some(key.clone()));
            }
            for key in entries.iter() {
                let got = trie.get(key).unwrap();
                if keep(key) {
                    prop_assert_eq!(got, Some(key.clone()));
                } else {
                    prop_assert!(got.is_none());
                }
            }
        }

        #[test]
        fn root_matches_reference_implementation(entries in btree_set(vec(any::<u8>(), 1..100), 1..100)) {
            let mut trie = Trie::new_temp();
            let mut reference = reference_trie();
            for key in entries.iter() {
                trie.insert(key.clone(), key.clone()).unwrap();
                reference.insert(key.clone(), key.clone()).unwrap();
            }
            prop_assert_eq!(trie.hash().unwrap().0.to_vec(), reference.root().unwrap());
        }

        #[test]
        fn root_matches_reference_after_removals(entries in btree_set(vec(any::<u8>(), 5..100), 1..100)) {
            let keep = |key: &Vec<u8>| key.first().is_none_or(|b| b % 2 == 0);
            let mut trie = Trie::new_temp();
            let mut reference = reference_trie();
            for key in entries.iter() {
                trie.insert(key.clone(), key.clone()).unwrap();
                reference.insert(key.clone(), key.clone()).unwrap();
            }
            for key in entries.iter().filter(|key| !keep(key)) {
                trie.remove(key.clone()).unwrap();
                reference.remove(key).unwrap();
            }
            prop_assert_eq!(trie.hash().unwrap().0.to_vec(), reference.root().unwrap());
        }

        #[test]
        fn root_matches_reference_between_inserts(entries in btree_set(vec(any::<u8>(), 1..100), 1..50)) {
            let mut trie = Trie::new_temp();
            let mut reference = reference_trie();
            for key in entries.iter() {
                trie.insert(key.clone(), key.clone()).unwrap();
                reference.insert(key.clone(), key.clone()).unwrap();
                prop_assert_eq!(trie.hash().unwrap().0.to_vec(), reference.root().unwrap());
            }
        }
    }
}
