//! RLP encodings for trie nodes. A node's encoding doubles as its DB value
//! and as its hashing preimage, so everything here must stay byte-stable.
use statecraft_rlp::{
    encode::{RLPEncode, encode_length, list_length},
    structs::Encoder,
};

use super::node::{BranchNode, ExtensionNode, LeafNode, Node};

fn branch_payload_length(node: &BranchNode) -> usize {
    let children: usize = node.choices.iter().map(RLPEncode::length).sum();
    children + <[u8] as RLPEncode>::length(&node.value)
}

impl RLPEncode for BranchNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        encode_length(branch_payload_length(self), buf);
        for child in &self.choices {
            child.encode(buf);
        }
        <[u8] as RLPEncode>::encode(&self.value, buf);
    }

    fn length(&self) -> usize {
        list_length(branch_payload_length(self))
    }

    // Overridden to preallocate the exact length
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.length());
        self.encode(&mut buf);
        buf
    }
}

impl RLPEncode for ExtensionNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_bytes(&self.prefix.encode_compact())
            .encode_field(&self.child)
            .finish();
    }
}

impl RLPEncode for LeafNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_bytes(&self.partial.encode_compact())
            .encode_bytes(&self.value)
            .finish()
    }
}

impl RLPEncode for Node {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            Node::Branch(node) => node.encode(buf),
            Node::Extension(node) => node.encode(buf),
            Node::Leaf(node) => node.encode(buf),
        }
    }
}
