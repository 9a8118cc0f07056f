use crate::error::TrieError;

/// Sequence of nibbles (half-bytes) forming a path in the trie.
/// A trailing 16 marks the path as complete, i.e. as addressing a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nibbles {
    data: Vec<u8>,
}

impl Nibbles {
    /// Wraps a list of already-split nibbles.
    pub const fn from_hex(hex: Vec<u8>) -> Self {
        Self { data: hex }
    }

    /// Splits each byte into two nibbles and appends the leaf flag.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_raw(bytes, true)
    }

    /// Splits each byte into two nibbles, appending the leaf flag only when
    /// `is_leaf` is set.
    pub fn from_raw(bytes: &[u8], is_leaf: bool) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 2 + usize::from(is_leaf));
        for byte in bytes {
            data.push(byte >> 4);
            data.push(byte & 0x0f);
        }
        if is_leaf {
            data.push(16);
        }
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes `prefix` off the front of self and reports whether it did.
    /// Self is left untouched when it does not start with `prefix`.
    pub fn skip_prefix(&mut self, prefix: &Nibbles) -> bool {
        if self.data.starts_with(&prefix.data) {
            self.data.drain(..prefix.len());
            true
        } else {
            false
        }
    }

    /// Number of leading nibbles shared with `other`.
    pub fn count_prefix(&self, other: &Nibbles) -> usize {
        self.data
            .iter()
            .zip(&other.data)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Removes and returns the first nibble.
    pub fn next(&mut self) -> Option<u8> {
        if self.data.is_empty() {
            None
        } else {
            Some(self.data.remove(0))
        }
    }

    /// Removes the first nibble and returns it as a branch choice index.
    /// The leaf flag does not index a choice, so it yields `None`.
    pub fn next_choice(&mut self) -> Option<usize> {
        self.next().filter(|nibble| *nibble < 16).map(usize::from)
    }

    /// Copy of the nibbles from `offset` onwards.
    pub fn offset(&self, offset: usize) -> Nibbles {
        self.slice(offset, self.len())
    }

    /// Copy of the nibbles in the range `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Nibbles {
        Self {
            data: self.data[start..end].to_vec(),
        }
    }

    /// Appends all of `other`'s nibbles.
    pub fn extend(&mut self, other: &Nibbles) {
        self.data.extend_from_slice(&other.data);
    }

    /// Nibble at position `i`. Panics when out of range.
    pub fn at(&self, i: usize) -> usize {
        self.data[i] as usize
    }

    /// Inserts a single nibble at the front.
    pub fn prepend(&mut self, nibble: u8) {
        self.data.insert(0, nibble);
    }

    /// Hex-prefix encoding: a header nibble carrying the leaf and parity
    /// flags, then the path packed two nibbles to a byte. An odd path stores
    /// its first nibble in the header's low half.
    ///
    /// header: 0 = even extension, 1 = odd extension, 2 = even leaf, 3 = odd leaf
    pub fn encode_compact(&self) -> Vec<u8> {
        let mut path = match self.data.split_last() {
            Some((&16, head)) => head,
            _ => &self.data,
        };
        let mut header = if path.len() < self.data.len() {
            0x20
        } else {
            0x00
        };
        if path.len() % 2 == 1 {
            header |= 0x10 | path[0];
            path = &path[1..];
        }

        let mut compact = Vec::with_capacity(1 + path.len() / 2);
        compact.push(header);
        compact.extend(path.chunks_exact(2).map(|pair| pair[0] << 4 | pair[1]));
        compact
    }

    /// Reverses [`encode_compact`](Nibbles::encode_compact), restoring the
    /// leaf flag from the header. Even an empty path encodes to one header
    /// byte, so empty input is malformed.
    pub fn decode_compact(compact: &[u8]) -> Result<Self, TrieError> {
        let Some((header, packed)) = compact.split_first() else {
            return Err(TrieError::InvalidPath);
        };
        let mut data = Vec::with_capacity(packed.len() * 2 + 2);
        if header & 0x10 != 0 {
            data.push(header & 0x0f);
        }
        for byte in packed {
            data.push(byte >> 4);
            data.push(byte & 0x0f);
        }
        if header & 0x20 != 0 {
            data.push(16);
        }
        Ok(Self { data })
    }

    /// True when the trailing nibble is the leaf flag.
    pub fn is_leaf(&self) -> bool {
        self.data.last() == Some(&16)
    }

    /// Packs the nibbles back into bytes, dropping the leaf flag. Fails when
    /// an odd number of nibbles remains, as whole bytes cannot be formed.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TrieError> {
        let path = match self.data.split_last() {
            Some((&16, head)) => head,
            _ => &self.data,
        };
        if path.len() % 2 != 0 {
            return Err(TrieError::InvalidKey);
        }
        Ok(path
            .chunks_exact(2)
            .map(|pair| pair[0] << 4 | pair[1])
            .collect())
    }

    /// New `Nibbles` holding self's nibbles followed by `other`'s.
    pub fn concat(&self, other: Nibbles) -> Nibbles {
        let mut data = self.data.clone();
        data.extend(other.data);
        Self { data }
    }
}

impl AsRef<[u8]> for Nibbles {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
