//! Hex (de)serialization for byte fields in portable JSON objects
//! (backup files, sync offers).

use serde::{Deserialize, Deserializer, Serializer};

pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    hex::decode(&encoded).map_err(serde::de::Error::custom)
}
