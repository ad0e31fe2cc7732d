//! Partition-key domains and values.

use serde::{Deserialize, Serialize};

/// The value domain of a partition dimension's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// 32-bit signed integer keys.
    Integer,
    /// 64-bit signed integer keys.
    BigInt,
    /// UTF-8 string keys.
    Text,
}

/// A concrete partition-key value, well-formed for exactly one
/// [`KeyType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKey {
    /// Value in the [`KeyType::Integer`] domain.
    Integer(i32),
    /// Value in the [`KeyType::BigInt`] domain.
    BigInt(i64),
    /// Value in the [`KeyType::Text`] domain.
    Text(String),
}

impl PartitionKey {
    /// The domain this value belongs to.
    pub fn key_type(&self) -> KeyType {
        match self {
            PartitionKey::Integer(_) => KeyType::Integer,
            PartitionKey::BigInt(_) => KeyType::BigInt,
            PartitionKey::Text(_) => KeyType::Text,
        }
    }

    /// Stable byte encoding used for hashing keys onto nodes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PartitionKey::Integer(v) => v.to_be_bytes().to_vec(),
            PartitionKey::BigInt(v) => v.to_be_bytes().to_vec(),
            PartitionKey::Text(v) => v.as_bytes().to_vec(),
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionKey::Integer(v) => write!(f, "{v}"),
            PartitionKey::BigInt(v) => write!(f, "{v}"),
            PartitionKey::Text(v) => f.write_str(v),
        }
    }
}
