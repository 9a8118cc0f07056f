use bytes::{BufMut, Bytes};
use ethereum_types::{Address, H256, U256};

use super::constants::{RLP_EMPTY_LIST, RLP_NULL};

/// A value that can be written out as RLP.
///
/// Implementors provide [`encode`](RLPEncode::encode); `length` has a
/// correct-by-construction default that counts an encoding pass, which the
/// impls here override with straight arithmetic.
pub trait RLPEncode {
    fn encode(&self, buf: &mut dyn BufMut);

    fn length(&self) -> usize {
        let mut scratch = Vec::new();
        self.encode(&mut scratch);
        scratch.len()
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// Writes the RLP form of a byte string.
///
/// A lone byte below 0x80 stands for itself; anything else gets a length
/// prefix, spilling into a length-of-length header from 56 bytes up.
pub fn encode_bytes(payload: &[u8], buf: &mut dyn BufMut) {
    match payload {
        [byte] if *byte < RLP_NULL => buf.put_u8(*byte),
        _ if payload.len() < 56 => {
            buf.put_u8(RLP_NULL + payload.len() as u8);
            buf.put_slice(payload);
        }
        _ => {
            put_long_length(0xb7, payload.len(), buf);
            buf.put_slice(payload);
        }
    }
}

/// Writes a list prefix for a payload of `total_len` bytes.
pub fn encode_length(total_len: usize, buf: &mut dyn BufMut) {
    if total_len < 56 {
        buf.put_u8(RLP_EMPTY_LIST + total_len as u8);
    } else {
        put_long_length(0xf7, total_len, buf);
    }
}

fn put_long_length(base: u8, len: usize, buf: &mut dyn BufMut) {
    let width = be_width(len);
    buf.put_u8(base + width as u8);
    buf.put_slice(&len.to_be_bytes()[size_of::<usize>() - width..]);
}

/// Encoded size of a byte string, prefix included.
pub fn bytes_length(payload: &[u8]) -> usize {
    match payload {
        [byte] if *byte < RLP_NULL => 1,
        _ if payload.len() < 56 => 1 + payload.len(),
        _ => 1 + be_width(payload.len()) + payload.len(),
    }
}

/// Encoded size of a list with a payload of `payload_len` bytes.
pub const fn list_length(payload_len: usize) -> usize {
    if payload_len < 56 {
        1 + payload_len
    } else {
        1 + be_width(payload_len) + payload_len
    }
}

/// Bytes needed for the minimal big-endian form of `value`.
const fn be_width(value: usize) -> usize {
    (usize::BITS - value.leading_zeros()).div_ceil(8) as usize
}

impl<T: RLPEncode + ?Sized> RLPEncode for &T {
    fn encode(&self, buf: &mut dyn BufMut) {
        (**self).encode(buf);
    }

    fn length(&self) -> usize {
        (**self).length()
    }
}

impl RLPEncode for bool {
    fn encode(&self, buf: &mut dyn BufMut) {
        buf.put_u8(if *self { 0x01 } else { RLP_NULL });
    }

    fn length(&self) -> usize {
        1
    }
}

macro_rules! impl_uint_encode {
    ($($t:ty),+) => {$(
        impl RLPEncode for $t {
            fn encode(&self, buf: &mut dyn BufMut) {
                let be = self.to_be_bytes();
                // Zero keeps no bytes at all and encodes as the empty string.
                let skip = (self.leading_zeros() / 8) as usize;
                encode_bytes(&be[skip..], buf);
            }

            fn length(&self) -> usize {
                if *self < 0x80 {
                    1
                } else {
                    1 + (<$t>::BITS - self.leading_zeros()).div_ceil(8) as usize
                }
            }
        }
    )+};
}

impl_uint_encode!(u8, u16, u32, u64, usize);

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        let be = self.to_big_endian();
        encode_bytes(&be[(self.leading_zeros() / 8) as usize..], buf);
    }

    fn length(&self) -> usize {
        let bits = self.bits();
        if bits < 8 { 1 } else { 1 + bits.div_ceil(8) }
    }
}

impl RLPEncode for [u8] {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }

    fn length(&self) -> usize {
        bytes_length(self)
    }
}

impl<const N: usize> RLPEncode for [u8; N] {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }

    fn length(&self) -> usize {
        bytes_length(self)
    }
}

impl RLPEncode for str {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }

    fn length(&self) -> usize {
        bytes_length(self.as_bytes())
    }
}

impl RLPEncode for String {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }

    fn length(&self) -> usize {
        bytes_length(self.as_bytes())
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }

    fn length(&self) -> usize {
        bytes_length(self)
    }
}

impl RLPEncode for Address {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }

    fn length(&self) -> usize {
        1 + Self::len_bytes()
    }
}

impl RLPEncode for H256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }

    fn length(&self) -> usize {
        1 + Self::len_bytes()
    }
}

impl<T: RLPEncode> RLPEncode for Vec<T> {
    fn encode(&self, buf: &mut dyn BufMut) {
        let payload_len: usize = self.iter().map(RLPEncode::length).sum();
        encode_length(payload_len, buf);
        for item in self {
            item.encode(buf);
        }
    }

    fn length(&self) -> usize {
        list_length(self.iter().map(RLPEncode::length).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// Encodes and cross-checks `length` against the bytes produced.
    fn encoded<T: RLPEncode + ?Sized>(value: &T) -> Vec<u8> {
        let mut buf = Vec::new();
        value.encode(&mut buf);
        assert_eq!(buf.len(), value.length(), "length() disagrees with encode()");
        buf
    }

    #[test]
    fn booleans() {
        assert_eq!(encoded(&true), [0x01]);
        assert_eq!(encoded(&false), [RLP_NULL]);
    }

    #[test]
    fn small_integers_are_single_bytes() {
        assert_eq!(encoded(&0u64), [RLP_NULL]);
        assert_eq!(encoded(&5u64), [0x05]);
        assert_eq!(encoded(&0x7fu32), [0x7f]);
    }

    #[test]
    fn integers_above_0x7f_get_a_prefix() {
        assert_eq!(encoded(&0x80u32), [0x81, 0x80]);
        assert_eq!(encoded(&1024u64), [0x82, 0x04, 0x00]);

        let mut expected = vec![RLP_NULL + 8];
        expected.extend([0xff; 8]);
        assert_eq!(encoded(&u64::MAX), expected);
    }

    #[test]
    fn u256_keeps_minimal_big_endian_bytes() {
        assert_eq!(encoded(&U256::zero()), [RLP_NULL]);
        assert_eq!(encoded(&U256::from(0x7f)), [0x7f]);
        assert_eq!(encoded(&U256::from(0x1234)), [0x82, 0x12, 0x34]);

        let mut expected = vec![RLP_NULL + 32];
        expected.extend([0xff; 32]);
        assert_eq!(encoded(&U256::max_value()), expected);
    }

    #[test]
    fn short_strings() {
        assert_eq!(encoded("dog"), [0x83, b'd', b'o', b'g']);
        assert_eq!(encoded(""), [RLP_NULL]);
    }

    #[test]
    fn the_56_byte_boundary_switches_to_long_form() {
        let short = [0x11u8; 55];
        let mut expected = vec![0xb7];
        expected.extend(short);
        assert_eq!(encoded(&short[..]), expected);

        let long = [0x11u8; 56];
        let mut expected = vec![0xb8, 56];
        expected.extend(long);
        assert_eq!(encoded(&long[..]), expected);
    }

    #[test]
    fn lone_small_bytes_collapse_to_themselves() {
        assert_eq!(encoded(&[0x2au8][..]), [0x2a]);
        // 0x80 is past the single-byte range and keeps its prefix.
        assert_eq!(encoded(&[0x80u8][..]), [0x81, 0x80]);
    }

    #[test]
    fn lists() {
        let expected = [0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        assert_eq!(encoded(&vec!["cat", "dog"]), expected);

        assert_eq!(encoded(&Vec::<u64>::new()), [RLP_EMPTY_LIST]);
        assert_eq!(encoded(&vec![1u64, 2, 3]), [0xc3, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn fixed_width_ethereum_types() {
        let address = Address::from(hex!("00000000219ab540356cbb839cbe05303d7705fa"));
        let mut expected = vec![RLP_NULL + 20];
        expected.extend(address.as_bytes());
        assert_eq!(encoded(&address), expected);

        let hash = H256(hex!(
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        ));
        let mut expected = vec![RLP_NULL + 32];
        expected.extend(hash.as_bytes());
        assert_eq!(encoded(&hash), expected);
    }

    #[test]
    fn bytes_encode_as_byte_strings() {
        let code = Bytes::from_static(&hex!("604260005260206000f3"));
        let mut expected = vec![RLP_NULL + 10];
        expected.extend(code.as_ref());
        assert_eq!(encoded(&code), expected);
    }
}
