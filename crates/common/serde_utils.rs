//! Serde helpers for the 0x-prefixed hex formats used by genesis files.
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

fn strip_0x(text: &str) -> &str {
    text.strip_prefix("0x").unwrap_or(text)
}

/// `U256` quantities given either as 0x-prefixed hex or as decimal strings.
pub mod u256_flexible {
    use ethereum_types::U256;

    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(d)?;
        match text.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16)
                .map_err(|err| D::Error::custom(format!("invalid hex quantity: {err}"))),
            None => U256::from_dec_str(&text)
                .map_err(|err| D::Error::custom(format!("invalid decimal quantity: {err}"))),
        }
    }
}

/// `u64` as a 0x-prefixed hex string.
pub mod hex_u64 {
    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(d)?;
        u64::from_str_radix(strip_0x(&text), 16)
            .map_err(|err| D::Error::custom(format!("invalid hex integer: {err}")))
    }

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{value:#x}"))
    }
}

/// Byte strings as 0x-prefixed hex.
pub mod hex_bytes {
    use bytes::Bytes;

    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(d)?;
        hex::decode(strip_0x(&text))
            .map(Bytes::from)
            .map_err(|err| D::Error::custom(format!("invalid hex bytes: {err}")))
    }

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{value:x}"))
    }
}
