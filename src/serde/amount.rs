//! Token amounts as decimal strings of base units.
//!
//! The record-keeping service is not hex aware, so amounts travel as `"1000000"` instead of the
//! `0xf4240` quantity encoding used on the JSON-RPC side. Plain JSON numbers are accepted on read.

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serializer, de::Error};

/// Serializes a [`U256`] as a decimal string.
pub fn serialize<S>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&amount.to_string())
}

/// Deserializes a decimal string, hex string or integer into a [`U256`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(U256::from(value)),
        Raw::Text(text) => text.parse::<U256>().map_err(D::Error::custom),
    }
}
