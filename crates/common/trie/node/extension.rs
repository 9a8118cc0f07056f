use crate::{
    ValueRLP, error::TrieError, nibbles::Nibbles, node_hash::NodeHash, state::TrieState,
};
use statecraft_rlp::encode::RLPEncode;

use super::{BranchNode, Node};

/// Path-compression node: a shared nibble prefix leading to a single child,
/// holding no value of its own
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeHash,
}

impl ExtensionNode {
    /// Creates a new extension node given its child hash and prefix
    pub const fn new(prefix: Nibbles, child: NodeHash) -> ExtensionNode {
        Self { prefix, child }
    }

    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        // If the path is prefixed by this node's prefix, delegate to its child.
        // Otherwise, no value is present.
        if path.skip_prefix(&self.prefix) {
            let child_node = state
                .get_node(self.child.clone())?
                .ok_or(TrieError::InconsistentTree)?;
            child_node.get(state, path)
        } else {
            Ok(None)
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        /* Possible flow paths:
            * Prefix fully matches path
            Extension { prefix, child } -> Extension { prefix, child' } (insert into child)
            * No match between path and prefix
            Extension { prefix, child } -> Branch { [ child', ... ], Leaf { path, value } } (if prefix was a single nibble)
            Extension { prefix, child } -> Branch { [ Extension { prefix[1..], child }, ... ], Leaf { path, value } } (otherwise)
            * Prefix partially matches path
            Extension { prefix, child } -> Extension { prefix[..match], Extension { prefix[match..], child' } } (insert into new child extension node)
        */
        let match_index = path.count_prefix(&self.prefix);
        if match_index == self.prefix.len() {
            // Insert into child node
            path.skip_prefix(&self.prefix);
            let child_node = state
                .get_node(self.child.clone())?
                .ok_or(TrieError::InconsistentTree)?;
            let new_child_node = child_node.insert(state, path, value)?;
            self.child = new_child_node.insert_self(state)?;
            Ok(self.into())
        } else if match_index == 0 {
            // No match between path and prefix, replace self with a branch node leading
            // to the child (or to an extension node with the remaining prefix)
            let new_node = if self.prefix.len() == 1 {
                self.child
            } else {
                ExtensionNode::new(self.prefix.offset(1), self.child).insert_self(state)?
            };
            let mut choices = BranchNode::EMPTY_CHOICES;
            choices[self.prefix.at(0)] = new_node;
            // Insert into the new branch node
            BranchNode::new(choices).insert(state, path, value)
        } else {
            // Partially shared prefix, split the prefix into a new extension node leading
            // to the child and delegate the insertion into it
            let new_extension = ExtensionNode::new(self.prefix.offset(match_index), self.child);
            let new_node = new_extension.insert(state, path.offset(match_index), value)?;
            self.prefix = self.prefix.slice(0, match_index);
            self.child = new_node.insert_self(state)?;
            Ok(self.into())
        }
    }

    /// Removes a value from the subtrie originating from this node given its path
    /// Returns the new root of the subtrie (if any) and the removed value if it existed in the subtrie
    pub fn remove(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        /* Possible flow paths:
            Extension { prefix, child } -> Extension { prefix, child } (no removal)
            Extension { prefix, child } -> None (if the child node was removed)
            Extension { prefix, child } -> Extension { prefix, child' } (if the child node was updated)
            Extension { prefix, child } -> Extension { prefix + child.prefix, child.child } (if the child turned into an extension node)
            Extension { prefix, child } -> Leaf { prefix + child.partial, child.value } (if the child turned into a leaf node)
        */

        // Check if the value is part of the child subtrie according to the prefix
        if path.skip_prefix(&self.prefix) {
            let child_node = state
                .get_node(self.child.clone())?
                .ok_or(TrieError::InconsistentTree)?;
            // Remove value from child subtrie
            let (child_node, old_value) = child_node.remove(state, path)?;
            // Restructure node based on removal
            let node = match child_node {
                // If the child subtrie was removed, remove self too
                None => None,
                Some(node) => Some(match node {
                    // If the child node is a branch node, update self's child
                    Node::Branch(branch_node) => {
                        self.child = branch_node.insert_self(state)?;
                        self.into()
                    }
                    // If the child node is an extension node, merge its prefix into self
                    Node::Extension(extension_node) => {
                        self.prefix.extend(&extension_node.prefix);
                        self.child = extension_node.child;
                        self.into()
                    }
                    // If the child node is a leaf node, replace self with it, merging prefixes
                    Node::Leaf(mut leaf_node) => {
                        leaf_node.partial = self.prefix.concat(leaf_node.partial);
                        leaf_node.into()
                    }
                }),
            };
            Ok((node, old_value))
        } else {
            Ok((Some(self.into()), None))
        }
    }

    /// Computes the node's hash
    pub fn compute_hash(&self) -> NodeHash {
        NodeHash::from_encoded_raw(&self.encode_to_vec())
    }

    /// Encodes the node and inserts it into the state, returning its hash
    pub fn insert_self(self, state: &mut TrieState) -> Result<NodeHash, TrieError> {
        let hash = self.compute_hash();
        state.insert_node(self.into(), hash.clone());
        Ok(hash)
    }
}
