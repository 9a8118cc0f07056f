/// The prefix for the empty string in RLP, also known as null.
pub const RLP_NULL: u8 = 0x80;

/// The prefix for the empty list in RLP.
pub const RLP_EMPTY_LIST: u8 = 0xc0;
