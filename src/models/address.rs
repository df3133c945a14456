//! EVM addresses are [`alloy_primitives::Address`]. Equality and hashing are by
//! value, so lowercase and checksummed spellings of one address are the same key.

pub use alloy_primitives::Address;

/// Serde adapter writing an [`Address`] in EIP-55 checksummed form
pub mod checksum {
    use super::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address.to_checksum(None))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }

    /// Same as the parent module for an optional address; `None` is `null`
    pub mod option {
        use super::Address;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(address: &Option<Address>, serializer: S) -> Result<S::Ok, S::Error> {
            match address {
                Some(address) => super::serialize(address, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Address>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
