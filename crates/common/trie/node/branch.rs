use crate::{
    ValueRLP, error::TrieError, nibbles::Nibbles, node_hash::NodeHash, state::TrieState,
};
use statecraft_rlp::encode::RLPEncode;

use super::{ExtensionNode, LeafNode, Node};

/// Fan-out node: sixteen child slots, one per nibble, plus an optional value
/// for a path ending at this node
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub choices: [NodeHash; 16],
    pub value: ValueRLP,
}

impl BranchNode {
    /// Empty choice array for more convenient node-building
    pub const EMPTY_CHOICES: [NodeHash; 16] = [
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
        NodeHash::const_default(),
    ];

    /// Creates a new branch node given its children, without any stored value
    pub const fn new(choices: [NodeHash; 16]) -> Self {
        Self {
            choices,
            value: Vec::new(),
        }
    }

    /// Creates a new branch node given its children and value
    pub const fn new_with_value(choices: [NodeHash; 16], value: ValueRLP) -> Self {
        Self { choices, value }
    }

    /// Updates the node's value
    pub fn update(&mut self, new_value: ValueRLP) {
        self.value = new_value;
    }

    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        // If path is at the end, return own value if present.
        // Otherwise, check the corresponding choice and delegate accordingly if present.
        if let Some(choice) = path.next_choice() {
            // Delegate to children if present
            let child_hash = &self.choices[choice];
            if child_hash.is_valid() {
                let child_node = state
                    .get_node(child_hash.clone())?
                    .ok_or(TrieError::InconsistentTree)?;
                child_node.get(state, path)
            } else {
                Ok(None)
            }
        } else {
            // Return internal value if present.
            Ok((!self.value.is_empty()).then(|| self.value.clone()))
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        // If path is at the end, insert or replace its own value.
        // Otherwise, check the corresponding choice and insert or delegate accordingly.
        if let Some(choice) = path.next_choice() {
            match &mut self.choices[choice] {
                // Create new child (leaf node)
                choice_hash if !choice_hash.is_valid() => {
                    let new_leaf = LeafNode::new(path, value);
                    let child_hash = new_leaf.insert_self(state)?;
                    *choice_hash = child_hash;
                }
                // Insert into existing child and then update it
                choice_hash => {
                    let child_node = state
                        .get_node(choice_hash.clone())?
                        .ok_or(TrieError::InconsistentTree)?;
                    let child_node = child_node.insert(state, path, value)?;
                    *choice_hash = child_node.insert_self(state)?;
                }
            }
        } else {
            // Insert into self
            self.update(value);
        }

        Ok(self.into())
    }

    /// Removes a value from the subtrie originating from this node given its path
    /// Returns the new root of the subtrie (if any) and the removed value if it existed in the subtrie
    pub fn remove(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        /* Possible flow paths:
            Step 1: Removal
                Branch { [ ... ], Value } -> Branch { [ ... ], None } (remove own value)
                Branch { [ childA, ... ], Value } -> Branch { [ childA', ... ], Value } (remove from child)

            Step 2: Restructure
                [0 children]
                Branch { [], Value } -> Leaf { Value } (no children, with value)
                Branch { [], None } -> Removed (no children, no value)
                [1 child]
                Branch { [ ExtensionChild ], None } -> Extension { ChoiceIndex + Child.Prefix, Child.Child }
                Branch { [ BranchChild ], None } -> Extension { ChoiceIndex, BranchChild }
                Branch { [ LeafChild ], None } -> Leaf { ChoiceIndex + Child.Partial, Child.Value }
                Branch { [ childA ], Value } -> Branch { [ childA ], Value }
                [2+ children]
                Branch { [ childA, childB, ... ], _ } -> Branch { [ childA, childB, ... ], _ }
        */

        // Step 1: Remove value
        // Check if the value is located in a child subtrie
        let value = if let Some(choice_index) = path.next_choice() {
            if self.choices[choice_index].is_valid() {
                let child_node = state
                    .get_node(self.choices[choice_index].clone())?
                    .ok_or(TrieError::InconsistentTree)?;
                // Remove value from child node
                let (child_node, old_value) = child_node.remove(state, path)?;
                // Update child subtrie if it still exists, remove its hash otherwise
                self.choices[choice_index] = match child_node {
                    Some(child_node) => child_node.insert_self(state)?,
                    None => NodeHash::default(),
                };
                old_value
            } else {
                None
            }
        } else {
            // Remove own value if it exists
            (!self.value.is_empty()).then(|| std::mem::take(&mut self.value))
        };

        // Step 2: Restructure self
        let children: Vec<_> = self
            .choices
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_valid())
            .map(|(index, child)| (index, child.clone()))
            .collect();

        let new_node = match (children.as_slice(), !self.value.is_empty()) {
            // If this node still has a child and a value, or multiple children, return the updated node
            ([_, ..], true) | ([_, _, ..], false) => Some(self.into()),
            // If this node has no children and a value, return a leaf node holding the value
            ([], true) => Some(LeafNode::new(Nibbles::from_hex(vec![16]), self.value).into()),
            // If this node has no children and no value, return no node
            ([], false) => None,
            // If this node has a single child and no value, replace it with its child node,
            // prepending the child's choice index to its path
            ([(choice_index, child_hash)], false) => {
                let child_node = state
                    .get_node(child_hash.clone())?
                    .ok_or(TrieError::InconsistentTree)?;
                match child_node {
                    // A branch child cannot be merged into a path, connect it through an extension node
                    Node::Branch(_) => Some(
                        ExtensionNode::new(
                            Nibbles::from_hex(vec![*choice_index as u8]),
                            child_hash.clone(),
                        )
                        .into(),
                    ),
                    Node::Extension(mut extension_node) => {
                        extension_node.prefix.prepend(*choice_index as u8);
                        Some(extension_node.into())
                    }
                    Node::Leaf(mut leaf_node) => {
                        leaf_node.partial.prepend(*choice_index as u8);
                        Some(leaf_node.into())
                    }
                }
            }
        };

        Ok((new_node, value))
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
