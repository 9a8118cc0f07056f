use super::{
    constants::{RLP_EMPTY_LIST, RLP_NULL},
    error::RLPDecodeError,
};
use bytes::Bytes;
use ethereum_types::{Address, H160, H256, U256};

/// Upper bound on a single item's payload. Well-formed trie nodes and account
/// records never get anywhere near this, so bigger claims are corrupt input.
const MAX_PAYLOAD_BYTES: usize = 1 << 30;

/// A value that can be parsed out of RLP bytes.
///
/// Implementors provide [`decode_unfinished`](RLPDecode::decode_unfinished),
/// which consumes one item off the front of the input and hands back the rest.
/// [`decode`](RLPDecode::decode) additionally demands the input ends there.
pub trait RLPDecode: Sized {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;

    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (value, rest) = Self::decode_unfinished(rlp)?;
        if rest.is_empty() {
            Ok(value)
        } else {
            Err(RLPDecodeError::InvalidLength)
        }
    }
}

/// A parsed item prefix: the kind of item, how many bytes the prefix itself
/// spans and how many payload bytes follow it.
struct ItemHeader {
    is_list: bool,
    offset: usize,
    payload_len: usize,
}

impl ItemHeader {
    fn parse(data: &[u8]) -> Result<Self, RLPDecodeError> {
        let first = *data.first().ok_or(RLPDecodeError::InvalidLength)?;
        match first {
            // A lone byte below 0x80 is its own payload.
            0x00..=0x7f => Ok(Self {
                is_list: false,
                offset: 0,
                payload_len: 1,
            }),
            RLP_NULL..=0xb7 => Ok(Self {
                is_list: false,
                offset: 1,
                payload_len: (first - RLP_NULL) as usize,
            }),
            0xb8..=0xbf => Self::parse_long(data, false, first - 0xb7),
            RLP_EMPTY_LIST..=0xf7 => Ok(Self {
                is_list: true,
                offset: 1,
                payload_len: (first - RLP_EMPTY_LIST) as usize,
            }),
            0xf8..=0xff => Self::parse_long(data, true, first - 0xf7),
        }
    }

    /// Long form: the prefix byte is followed by `width` big-endian bytes
    /// holding the payload length. A leading zero there is non-canonical.
    fn parse_long(data: &[u8], is_list: bool, width: u8) -> Result<Self, RLPDecodeError> {
        let width = width as usize;
        let length_bytes = data
            .get(1..1 + width)
            .ok_or(RLPDecodeError::InvalidLength)?;
        let payload_len = usize::from_be_bytes(left_pad(length_bytes)?);
        Ok(Self {
            is_list,
            offset: 1 + width,
            payload_len,
        })
    }

    /// Splits the input into the item's payload and whatever follows it.
    fn split<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8]), RLPDecodeError> {
        if self.payload_len > MAX_PAYLOAD_BYTES {
            return Err(RLPDecodeError::InvalidLength);
        }
        let end = self.offset + self.payload_len;
        if data.len() < end {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((&data[self.offset..end], &data[end..]))
    }
}

/// Parses one RLP item, returning whether it is a list, its payload without
/// the prefix, and the remaining input after it.
pub fn decode_rlp_item(data: &[u8]) -> Result<(bool, &[u8], &[u8]), RLPDecodeError> {
    let header = ItemHeader::parse(data)?;
    let (payload, rest) = header.split(data)?;
    Ok((header.is_list, payload, rest))
}

/// Parses one RLP byte string, rejecting lists.
pub fn decode_bytes(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    match decode_rlp_item(data)? {
        (false, payload, rest) => Ok((payload, rest)),
        (true, ..) => Err(RLPDecodeError::UnexpectedList),
    }
}

/// Splits off the first item with its prefix still attached.
pub(crate) fn split_item(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let header = ItemHeader::parse(data)?;
    let (_, rest) = header.split(data)?;
    let taken = data.len() - rest.len();
    Ok((&data[..taken], rest))
}

/// Left-pads minimal big-endian bytes out to a fixed width, rejecting
/// non-canonical leading zeros.
fn left_pad<const N: usize>(data: &[u8]) -> Result<[u8; N], RLPDecodeError> {
    if data.len() > N {
        return Err(RLPDecodeError::InvalidLength);
    }
    if data.first() == Some(&0) {
        return Err(RLPDecodeError::MalformedData);
    }
    let mut padded = [0u8; N];
    padded[N - data.len()..].copy_from_slice(data);
    Ok(padded)
}

impl RLPDecode for bool {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        match rlp.split_first() {
            Some((&RLP_NULL, rest)) => Ok((false, rest)),
            Some((&0x01, rest)) => Ok((true, rest)),
            Some((&other, _)) => Err(RLPDecodeError::MalformedBoolean(other)),
            None => Err(RLPDecodeError::InvalidLength),
        }
    }
}

macro_rules! impl_uint_decode {
    ($($t:ty),+) => {$(
        impl RLPDecode for $t {
            fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                let (payload, rest) = decode_bytes(rlp)?;
                Ok((<$t>::from_be_bytes(left_pad(payload)?), rest))
            }
        }
    )+};
}

impl_uint_decode!(u8, u16, u32, u64, usize);

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        let word: [u8; 32] = left_pad(payload)?;
        Ok((U256::from_big_endian(&word), rest))
    }
}

impl<const N: usize> RLPDecode for [u8; N] {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        let bytes = payload
            .try_into()
            .map_err(|_| RLPDecodeError::InvalidLength)?;
        Ok((bytes, rest))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        Ok((Bytes::copy_from_slice(payload), rest))
    }
}

impl RLPDecode for H256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = <[u8; 32]>::decode_unfinished(rlp)?;
        Ok((H256(bytes), rest))
    }
}

impl RLPDecode for Address {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = <[u8; 20]>::decode_unfinished(rlp)?;
        Ok((H160(bytes), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (payload, rest) = decode_bytes(rlp)?;
        let text = std::str::from_utf8(payload).map_err(|_| RLPDecodeError::MalformedData)?;
        Ok((text.to_owned(), rest))
    }
}

impl<T: RLPDecode> RLPDecode for Vec<T> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, mut payload, rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::MalformedData);
        }
        let mut items = Vec::new();
        while !payload.is_empty() {
            let (item, next) = T::decode_unfinished(payload)?;
            items.push(item);
            payload = next;
        }
        Ok((items, rest))
    }
}
