use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use sha3::{Digest, Keccak256};

use statecraft_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use statecraft_trie::Trie;

use crate::constants::{EMPTY_KECCAK_HASH, EMPTY_TRIE_HASH};
use crate::types::GenesisAccount;

/// Account record as committed to the state trie.
///
/// The trie encoding is the canonical four element list
/// `[nonce, balance, storage_root, code_hash]`; the EIP-7702 delegation
/// target is runtime-only bookkeeping and never enters the encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
    /// Delegation target per EIP-7702. Only an account without contract
    /// code may carry one.
    pub delegated_address: Option<Address>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root: EMPTY_TRIE_HASH,
            code_hash: EMPTY_KECCAK_HASH,
            delegated_address: None,
        }
    }
}

impl Account {
    /// Returns true if the account holds contract code. Both the zero hash
    /// and the hash of the empty byte string count as "no code".
    pub fn has_code(&self) -> bool {
        !(self.code_hash.is_zero() || self.code_hash == EMPTY_KECCAK_HASH)
    }

    /// Returns true if the account is indistinguishable from a missing one:
    /// zero balance, zero nonce, no code and no delegation.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero()
            && self.nonce == 0
            && !self.has_code()
            && self.delegated_address.is_none()
    }
}

impl RLPEncode for Account {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.balance)
            .encode_field(&self.storage_root)
            .encode_field(&self.code_hash)
            .finish();
    }
}

impl RLPDecode for Account {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (balance, decoder) = decoder.decode_field("balance")?;
        let (storage_root, decoder) = decoder.decode_field("storage_root")?;
        let (code_hash, decoder) = decoder.decode_field("code_hash")?;
        let remaining = decoder.finish()?;
        let account = Account {
            nonce,
            balance,
            storage_root,
            code_hash,
            delegated_address: None,
        };
        Ok((account, remaining))
    }
}

impl From<&GenesisAccount> for Account {
    fn from(genesis: &GenesisAccount) -> Self {
        Self {
            nonce: genesis.nonce,
            balance: genesis.balance,
            storage_root: compute_storage_root(&genesis.storage),
            code_hash: code_hash(&genesis.code),
            delegated_address: None,
        }
    }
}

/// Subset of an account that execution touches most often, detached from
/// its storage commitment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub code_hash: H256,
    pub balance: U256,
    pub nonce: u64,
}

/// Keccak256 digest of a code blob.
pub fn code_hash(code: &Bytes) -> H256 {
    H256::from_slice(Keccak256::digest(code).as_slice())
}

/// Root of the storage trie holding the given slots, keyed by
/// `Keccak256(slot)` with RLP-encoded values. Zero-valued slots are
/// absent from the trie by definition.
pub fn compute_storage_root<'a>(
    storage: impl IntoIterator<Item = (&'a U256, &'a U256)>,
) -> H256 {
    let iter = storage
        .into_iter()
        .filter(|(_, value)| !value.is_zero())
        .map(|(key, value)| {
            (
                Keccak256::digest(key.to_big_endian()).to_vec(),
                value.encode_to_vec(),
            )
        });
    Trie::compute_hash_from_unsorted_iter(iter)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use hex_literal::hex;

    #[test]
    fn account_rlp_known_encoding() {
        let account = Account {
            nonce: 1,
            balance: U256::from(42),
            ..Default::default()
        };
        assert_eq!(
            account.encode_to_vec(),
            hex!(
                "f844012aa056e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622f"
                "b5e363b421a0c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfa"
                "d8045d85a470"
            )
        );
    }

    #[test]
    fn default_account_rlp_known_encoding() {
        assert_eq!(
            Account::default().encode_to_vec(),
            hex!(
                "f8448080a056e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622f"
                "b5e363b421a0c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfa"
                "d8045d85a470"
            )
        );
    }

    #[test]
    fn account_rlp_round_trip() {
        let account = Account {
            nonce: 77,
            balance: U256::from_dec_str("1000000000000000000").unwrap(),
            storage_root: H256::random(),
            code_hash: H256::random(),
            delegated_address: None,
        };
        let encoded = account.encode_to_vec();
        assert_eq!(Account::decode(&encoded).unwrap(), account);
    }

    #[test]
    fn account_rlp_decode_zero_hashes() {
        let encoded = hex!(
            "f8448080a00000000000000000000000000000000000000000000000000000000000000000"
            "a00000000000000000000000000000000000000000000000000000000000000000"
        );
        let account = Account::decode(&encoded).unwrap();
        assert_eq!(account.nonce, 0);
        assert_eq!(account.balance, U256::zero());
        assert_eq!(account.storage_root, H256::zero());
        assert_eq!(account.code_hash, H256::zero());
        assert_eq!(account.delegated_address, None);
        assert_eq!(account.encode_to_vec(), encoded);
    }

    #[test]
    fn delegation_never_enters_the_encoding() {
        let plain = Account {
            nonce: 1,
            balance: U256::from(42),
            ..Default::default()
        };
        let delegating = Account {
            delegated_address: Some(Address::from_low_u64_be(7)),
            ..plain.clone()
        };
        assert_eq!(plain.encode_to_vec(), delegating.encode_to_vec());
    }

    #[test]
    fn code_hash_known_digests() {
        assert_eq!(code_hash(&Bytes::new()), EMPTY_KECCAK_HASH);
        let runtime = Bytes::from(hex!("604260005260206000f3").to_vec());
        assert_eq!(
            code_hash(&runtime),
            H256(hex!(
                "546a9b5177a42de9007de1b0b8df0a94bf6235ace48d2b813217c7757047c6ae"
            ))
        );
    }

    #[test]
    fn storage_root_of_empty_storage() {
        assert_eq!(compute_storage_root(&HashMap::new()), EMPTY_TRIE_HASH);
    }

    #[test]
    fn storage_root_ignores_zero_slots() {
        let expected = H256(hex!(
            "fcbdb9e7191a6bc6efbe2e1903a50bd3c79312366db1e46acf7e94788c2b4c3e"
        ));
        let storage = HashMap::from([(U256::from(1), U256::from(42))]);
        assert_eq!(compute_storage_root(&storage), expected);

        let with_zero = HashMap::from([
            (U256::from(1), U256::from(42)),
            (U256::from(2), U256::zero()),
        ]);
        assert_eq!(compute_storage_root(&with_zero), expected);
    }

    #[test]
    fn storage_root_multiple_slots() {
        let storage = HashMap::from([
            (U256::zero(), U256::from(1)),
            (U256::from(1), U256::from(2)),
            (U256::from(0x200), U256::from(3)),
        ]);
        assert_eq!(
            compute_storage_root(&storage),
            H256(hex!(
                "8e85c660742a67f82bbce9137b27b86e99808b5f8b78663c63f6086748c22a4f"
            ))
        );
    }

    #[test]
    fn genesis_account_conversion() {
        let genesis = GenesisAccount {
            code: Bytes::from(hex!("604260005260206000f3").to_vec()),
            storage: HashMap::from([(U256::from(1), U256::from(42))]),
            balance: U256::from(31415),
            nonce: 2,
        };
        let account = Account::from(&genesis);
        assert_eq!(account.nonce, 2);
        assert_eq!(account.balance, U256::from(31415));
        assert_eq!(
            account.storage_root,
            H256(hex!(
                "fcbdb9e7191a6bc6efbe2e1903a50bd3c79312366db1e46acf7e94788c2b4c3e"
            ))
        );
        assert_eq!(
            account.code_hash,
            H256(hex!(
                "546a9b5177a42de9007de1b0b8df0a94bf6235ace48d2b813217c7757047c6ae"
            ))
        );
        assert_eq!(account.delegated_address, None);
    }

    #[test]
    fn empty_and_code_predicates() {
        let mut account = Account::default();
        assert!(account.is_empty());
        assert!(!account.has_code());

        account.code_hash = H256::zero();
        assert!(account.is_empty());

        account.balance = U256::from(1);
        assert!(!account.is_empty());

        account.balance = U256::zero();
        account.delegated_address = Some(Address::from_low_u64_be(1));
        assert!(!account.is_empty());
        assert!(!account.has_code());

        account.delegated_address = None;
        account.code_hash = code_hash(&Bytes::from_static(b"\x00"));
        assert!(account.has_code());
        assert!(!account.is_empty());
    }
}
