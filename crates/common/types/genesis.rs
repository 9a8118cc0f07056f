use std::collections::{BTreeMap, HashMap};
use std::io::BufReader;
use std::path::Path;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use statecraft_rlp::encode::RLPEncode;
use statecraft_trie::Trie;

use crate::types::Account;

/// Initial allocation for a fresh store: the accounts that exist before
/// any mutation, in the geth `genesis.json` format (prefunded developer
/// accounts, test fixtures).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Genesis {
    /// The initial state of the accounts.
    /// A BTreeMap so iteration over the allocation is stable.
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("malformed genesis file: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot read genesis file: {0}")]
    File(#[from] std::io::Error),
}

impl TryFrom<&Path> for Genesis {
    type Error = GenesisError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    #[serde(deserialize_with = "crate::serde_utils::u256_flexible::deserialize")]
    pub balance: U256,
    #[serde(default, with = "crate::serde_utils::hex_u64")]
    pub nonce: u64,
    #[serde(default, with = "crate::serde_utils::hex_bytes")]
    pub code: Bytes,
    #[serde(default)]
    pub storage: HashMap<U256, U256>,
}

impl Genesis {
    pub fn compute_state_root(&self) -> H256 {
        Trie::compute_hash_from_unsorted_iter(self.alloc.iter().map(|(address, account)| {
            let account = Account::from(account);
            (Keccak256::digest(address).to_vec(), account.encode_to_vec())
        }))
    }
}
