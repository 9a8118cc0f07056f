use ethereum_types::H256;
use hex_literal::hex;

/// Keccak256 digest of the empty byte string, the code hash of every
/// account without contract code.
pub const EMPTY_KECCAK_HASH: H256 = H256(hex!(
    "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
));

/// Root of a trie with no entries, equal to Keccak256(RLP("")).
pub const EMPTY_TRIE_HASH: H256 = H256(hex!(
    "56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
));
