use crate::{
    ValueRLP, error::TrieError, nibbles::Nibbles, node_hash::NodeHash, state::TrieState,
};
use statecraft_rlp::encode::RLPEncode;

use super::{BranchNode, ExtensionNode, Node};

/// Terminal node holding the remaining path and the stored value
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: ValueRLP,
}

impl LeafNode {
    /// Creates a new leaf node and stores the given (path, value) pair
    pub const fn new(partial: Nibbles, value: ValueRLP) -> Self {
        Self { partial, value }
    }

    /// Returns the stored value if the given path matches the stored path
    pub fn get(&self, path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        if self.partial == path {
            Ok(Some(self.value.clone()))
        } else {
            Ok(None)
        }
    }

    /// Stores the received value and returns the new root of the subtrie previously consisting of self
    pub fn insert(
        mut self,
        state: &mut TrieState,
        path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        /* Possible flow paths:
            Leaf { path, value } -> Leaf { path, new_value } (path matches stored path)
            Leaf { path, value } -> Branch { [ Leaf { partial, value } , ... ], SelfValue } (paths diverge after the stored path ends)
            Leaf { path, value } -> Branch { [ Self { partial, value }, ... ], Value } (paths diverge after the new path ends)
            Leaf { path, value } -> Branch { [ Leaf { partial, value }, Self { partial, value}, ... ], None } (paths diverge midway)
            Extension { common, Branch { ... } } (as above but with a common prefix to strip)
        */
        // If the path matches the stored path, update the value and return self
        if self.partial == path {
            self.value = value;
            Ok(self.into())
        } else {
            let match_index = path.count_prefix(&self.partial);
            let branch_node = if self.partial.at(match_index) == 16 {
                // Create a new leaf node and store the path's value in it
                // Create a new branch node with the leaf as a child and store self's value
                // Branch { [ Leaf { Value } , ... ], SelfValue }
                let new_leaf = LeafNode::new(path.offset(match_index + 1), value);
                let mut choices = BranchNode::EMPTY_CHOICES;
                choices[path.at(match_index)] = new_leaf.insert_self(state)?;
                BranchNode::new_with_value(choices, self.value)
            } else if path.at(match_index) == 16 {
                // Create a new leaf node and store self's value in it
                // Create a new branch node with the leaf as a child and store the path's value
                // Branch { [ Self , ... ], Value }
                let new_leaf = LeafNode::new(self.partial.offset(match_index + 1), self.value);
                let mut choices = BranchNode::EMPTY_CHOICES;
                choices[self.partial.at(match_index)] = new_leaf.insert_self(state)?;
                BranchNode::new_with_value(choices, value)
            } else {
                // Create a new leaf node to store the path's value
                // Create a new branch node with the new leaf and self as children
                // Branch { [ Leaf { Value }, Self, ... ], None }
                let new_leaf = LeafNode::new(path.offset(match_index + 1), value);
                let child_hash = new_leaf.insert_self(state)?;
                let mut choices = BranchNode::EMPTY_CHOICES;
                choices[path.at(match_index)] = child_hash;
                let self_choice = self.partial.at(match_index);
                let self_leaf = LeafNode::new(self.partial.offset(match_index + 1), self.value);
                choices[self_choice] = self_leaf.insert_self(state)?;
                BranchNode::new(choices)
            };

            // Create an extension node with the branch node as child if the paths share a common prefix
            let final_node = if match_index == 0 {
                branch_node.into()
            } else {
                ExtensionNode::new(path.slice(0, match_index), branch_node.insert_self(state)?)
                    .into()
            };

            Ok(final_node)
        }
    }

    /// Removes own value if the path matches own path and returns self and the value if it was removed
    pub fn remove(self, path: Nibbles) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        Ok(if self.partial == path {
            (None, Some(self.value))
        } else {
            (Some(self.into()), None)
        })
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
