mod branch;
mod extension;
mod leaf;

use std::array;

pub use branch::BranchNode;
pub use extension::ExtensionNode;
pub use leaf::LeafNode;

use statecraft_rlp::{decode::decode_bytes, error::RLPDecodeError, structs::Decoder};

use crate::{error::TrieError, nibbles::Nibbles, state::TrieState};

use super::{ValueRLP, node_hash::NodeHash};

/// A node of the trie, in one of its three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(Box<BranchNode>),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl From<Box<BranchNode>> for Node {
    fn from(node: Box<BranchNode>) -> Self {
        Node::Branch(node)
    }
}

impl From<BranchNode> for Node {
    fn from(node: BranchNode) -> Self {
        Node::Branch(Box::new(node))
    }
}

impl From<ExtensionNode> for Node {
    fn from(node: ExtensionNode) -> Self {
        Node::Extension(node)
    }
}

impl From<LeafNode> for Node {
    fn from(node: LeafNode) -> Self {
        Node::Leaf(node)
    }
}

impl Node {
    /// Looks up the value stored under `path` in the subtrie rooted at this node.
    pub fn get(&self, state: &TrieState, path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match self {
            Node::Branch(node) => node.get(state, path),
            Node::Extension(node) => node.get(state, path),
            Node::Leaf(node) => node.get(path),
        }
    }

    /// Stores `value` under `path` in the subtrie rooted at this node,
    /// returning the subtrie's new root node.
    pub fn insert(
        self,
        state: &mut TrieState,
        path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        match self {
            Node::Branch(node) => node.insert(state, path, value),
            Node::Extension(node) => node.insert(state, path, value),
            Node::Leaf(node) => node.insert(state, path, value),
        }
    }

    /// Removes the value stored under `path` from the subtrie rooted at this
    /// node. Returns the subtrie's new root, if any node survives, along with
    /// the removed value.
    pub fn remove(
        self,
        state: &mut TrieState,
        path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        match self {
            Node::Branch(node) => node.remove(state, path),
            Node::Extension(node) => node.remove(state, path),
            Node::Leaf(node) => node.remove(path),
        }
    }

    /// Reference for this node as seen by its parent: the hash of its
    /// encoding, or the encoding itself when short enough to inline.
    pub fn compute_hash(&self) -> NodeHash {
        match self {
            Node::Branch(node) => node.compute_hash(),
            Node::Extension(node) => node.compute_hash(),
            Node::Leaf(node) => node.compute_hash(),
        }
    }

    /// Hands the node over to the state, keyed by its own hash.
    pub fn insert_self(self, state: &mut TrieState) -> Result<NodeHash, TrieError> {
        let hash = self.compute_hash();
        state.insert_node(self, hash.clone());
        Ok(hash)
    }

    /// Decodes a node from its RLP encoding. The field count tells the
    /// shapes apart: two fields make a leaf or extension, seventeen a branch.
    pub fn decode_raw(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let mut decoder = Decoder::new(rlp)?;
        let mut fields = Vec::with_capacity(17);
        while !decoder.is_done() {
            let field;
            (field, decoder) = decoder.get_encoded_item()?;
            fields.push(field);
            if fields.len() > 17 {
                return Err(RLPDecodeError::Custom(
                    "trie node encodes more than 17 fields".to_string(),
                ));
            }
        }

        match fields.as_slice() {
            [path, payload] => {
                let (path, _) = decode_bytes(path)?;
                let path =
                    Nibbles::decode_compact(path).map_err(|_| RLPDecodeError::MalformedData)?;
                if path.is_leaf() {
                    let (value, _) = decode_bytes(payload)?;
                    Ok(LeafNode::new(path, value.to_vec()).into())
                } else {
                    Ok(ExtensionNode::new(path, decode_child(payload)).into())
                }
            }
            [children @ .., value] if children.len() == 16 => {
                let choices = array::from_fn(|i| decode_child(&children[i]));
                let (value, _) = decode_bytes(value)?;
                Ok(BranchNode::new_with_value(choices, value.to_vec()).into())
            }
            other => Err(RLPDecodeError::Custom(format!(
                "trie node encodes {} fields, expected 2 or 17",
                other.len()
            ))),
        }
    }
}

/// Reads a child reference out of its position in the parent's encoding.
/// An empty string means no child, a 32 byte string is a hash reference and
/// anything else is an inlined node, kept verbatim.
fn decode_child(rlp: &[u8]) -> NodeHash {
    match decode_bytes(rlp) {
        Ok(([], [])) => NodeHash::default(),
        Ok((hash, [])) if hash.len() == 32 => NodeHash::from_slice(hash),
        _ => NodeHash::from_slice(rlp),
    }
}
