use ethereum_types::H256;
use sha3::{Digest, Keccak256};
use statecraft_rlp::{constants::RLP_NULL, encode::RLPEncode};

/// Reference to a node in the trie.
/// Nodes whose RLP encoding is shorter than 32 bytes are not hashed, their
/// encoding is embedded as-is wherever the node is referenced instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeHash {
    Hashed(H256),
    Inline(Vec<u8>),
}

impl NodeHash {
    /// Const version of `Default` trait impl
    pub const fn const_default() -> NodeHash {
        NodeHash::Inline(Vec::new())
    }

    /// Returns the `NodeHash` of an encoded node (encoded using the NodeEncoder)
    pub fn from_encoded_raw(encoded: &[u8]) -> NodeHash {
        if encoded.len() >= 32 {
            let hash = Keccak256::new_with_prefix(encoded).finalize();
            NodeHash::Hashed(H256::from_slice(hash.as_slice()))
        } else {
            NodeHash::Inline(encoded.to_vec())
        }
    }

    /// Builds a `NodeHash` from a slice, either a 32 byte hash or a shorter inline node
    pub fn from_slice(slice: &[u8]) -> NodeHash {
        match slice.len() {
            32 => NodeHash::Hashed(H256::from_slice(slice)),
            _ => NodeHash::Inline(slice.to_vec()),
        }
    }

    /// Converts a hash to its canonical 32 byte form, hashing the node's encoding if it was inlined
    pub fn finalize(&self) -> H256 {
        match self {
            NodeHash::Inline(raw) => H256::from_slice(
                Keccak256::new()
                    .chain_update(raw.as_slice())
                    .finalize()
                    .as_slice(),
            ),
            NodeHash::Hashed(hash) => *hash,
        }
    }

    /// Returns true if the hash is valid
    /// The default hash (empty inline) is used to represent the absence of a node
    /// and is considered invalid
    pub fn is_valid(&self) -> bool {
        !matches!(self, NodeHash::Inline(raw) if raw.is_empty())
    }
}

impl From<H256> for NodeHash {
    fn from(value: H256) -> Self {
        NodeHash::Hashed(value)
    }
}

impl From<NodeHash> for Vec<u8> {
    fn from(value: NodeHash) -> Self {
        match value {
            NodeHash::Hashed(hash) => hash.0.to_vec(),
            NodeHash::Inline(raw) => raw,
        }
    }
}

impl From<&NodeHash> for Vec<u8> {
    fn from(value: &NodeHash) -> Self {
        match value {
            NodeHash::Hashed(hash) => hash.0.to_vec(),
            NodeHash::Inline(raw) => raw.clone(),
        }
    }
}

impl Default for NodeHash {
    fn default() -> Self {
        NodeHash::const_default()
    }
}

impl RLPEncode for NodeHash {
    /// Encodes the hash as a child reference inside a parent node.
    /// Hashed nodes are referenced by their hash (a 32 byte string), inlined
    /// nodes are embedded raw and absent children become an empty string.
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            NodeHash::Hashed(hash) => hash.encode(buf),
            NodeHash::Inline(raw) if raw.is_empty() => buf.put_u8(RLP_NULL),
            NodeHash::Inline(raw) => buf.put_slice(raw),
        }
    }

    fn length(&self) -> usize {
        match self {
            NodeHash::Hashed(_) => 33,
            NodeHash::Inline(raw) if raw.is_empty() => 1,
            NodeHash::Inline(raw) => raw.len(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn short_encodings_are_inlined() {
        let encoded = [0xc5, 0x84, 0x01, 0x02, 0x03, 0x04];
        let hash = NodeHash::from_encoded_raw(&encoded);
        assert_eq!(hash, NodeHash::Inline(encoded.to_vec()));
        assert!(hash.is_valid());
    }

    #[test]
    fn long_encodings_are_hashed() {
        let encoded = [0xff; 32];
        let hash = NodeHash::from_encoded_raw(&encoded);
        let NodeHash::Hashed(digest) = hash else {
            panic!("expected a hashed node");
        };
        assert_eq!(
            digest.0,
            hex!("a9c584056064687e149968cbab758a3376d22aedc6a55823d1b3ecbee81b8fb9")
        );
    }

    #[test]
    fn finalize_hashes_inlined_nodes() {
        // keccak of the empty string
        assert_eq!(
            NodeHash::const_default().finalize().0,
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn default_hash_is_invalid() {
        assert!(!NodeHash::default().is_valid());
    }
}
