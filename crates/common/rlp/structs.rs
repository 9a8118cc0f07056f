use super::{
    decode::{RLPDecode, decode_rlp_item, split_item},
    encode::{RLPEncode, encode_bytes, encode_length},
    error::RLPDecodeError,
};
use bytes::BufMut;

/// Field-by-field decoder for struct-shaped RLP lists.
///
/// Fields come back in encoding order through [`decode_field`](Decoder::decode_field),
/// and [`finish`](Decoder::finish) checks none were left behind.
///
/// ```
/// # use statecraft_rlp::structs::Decoder;
/// let rlp = [0xc4, 0x2a, 0x82, 0x1f, 0x90];
/// let decoder = Decoder::new(&rlp).unwrap();
/// let (left, decoder) = decoder.decode_field::<u64>("left").unwrap();
/// let (right, decoder) = decoder.decode_field::<u64>("right").unwrap();
/// assert_eq!((left, right), (42, 8080));
/// assert!(decoder.finish().unwrap().is_empty());
/// ```
#[derive(Debug)]
#[must_use = "a Decoder does nothing until driven through its fields"]
pub struct Decoder<'a> {
    fields: &'a [u8],
    after: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(rlp: &'a [u8]) -> Result<Self, RLPDecodeError> {
        match decode_rlp_item(rlp)? {
            (true, fields, after) => Ok(Self { fields, after }),
            (false, ..) => Err(RLPDecodeError::UnexpectedString),
        }
    }

    /// Decodes the next field, naming it in the error on failure.
    pub fn decode_field<T: RLPDecode>(self, name: &str) -> Result<(T, Self), RLPDecodeError> {
        match T::decode_unfinished(self.fields) {
            Ok((value, fields)) => Ok((value, Self { fields, ..self })),
            Err(err) => Err(RLPDecodeError::Custom(format!(
                "couldn't decode field '{name}': {err}"
            ))),
        }
    }

    /// Takes the next field as raw RLP, prefix included, without decoding it.
    pub fn get_encoded_item(self) -> Result<(Vec<u8>, Self), RLPDecodeError> {
        let (item, fields) = split_item(self.fields)?;
        Ok((item.to_vec(), Self { fields, ..self }))
    }

    /// True once every field of the list has been consumed.
    pub const fn is_done(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks all fields were consumed and returns the input after the list.
    pub const fn finish(self) -> Result<&'a [u8], RLPDecodeError> {
        if self.fields.is_empty() {
            Ok(self.after)
        } else {
            Err(RLPDecodeError::MalformedData)
        }
    }
}

/// Field-by-field encoder producing a struct-shaped RLP list.
///
/// Fields accumulate through [`encode_field`](Encoder::encode_field) and the
/// prefixed list is written out by [`finish`](Encoder::finish).
///
/// ```
/// # use statecraft_rlp::structs::Encoder;
/// let mut buf = Vec::new();
/// Encoder::new(&mut buf)
///     .encode_field(&42u64)
///     .encode_field(&8080u64)
///     .finish();
/// assert_eq!(buf, [0xc4, 0x2a, 0x82, 0x1f, 0x90]);
/// ```
#[must_use = "an Encoder writes nothing until `finish` is called"]
pub struct Encoder<'a> {
    out: &'a mut dyn BufMut,
    payload: Vec<u8>,
}

impl<'a> Encoder<'a> {
    pub fn new(out: &'a mut dyn BufMut) -> Self {
        Self {
            out,
            payload: Vec::new(),
        }
    }

    /// Appends one field to the list under construction.
    pub fn encode_field<T: RLPEncode>(mut self, value: &T) -> Self {
        value.encode(&mut self.payload);
        self
    }

    /// Appends a field that is a plain byte string. Sidesteps the `Vec<T>`
    /// impl, under which a `Vec<u8>` would encode as a list of integers.
    pub fn encode_bytes(mut self, value: &[u8]) -> Self {
        encode_bytes(value, &mut self.payload);
        self
    }

    /// Writes the list prefix followed by the accumulated fields.
    pub fn finish(self) {
        encode_length(self.payload.len(), self.out);
        self.out.put_slice(&self.payload);
    }
}

// BufMut has no Debug impl to lean on for the output handle.
impl core::fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Encoder")
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
