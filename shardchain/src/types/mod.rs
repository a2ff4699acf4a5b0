//! Core domain types used by the sharded chain.
//!
//! This module defines strongly-typed hashes, shard identifiers and the
//! registry of recognized shards that are shared across the fork-choice
//! implementation. The goal is to avoid "naked" byte buffers and integers
//! in public APIs and instead use domain-specific newtypes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Blocks, headers and block hashing.
pub mod block;
/// Cross-shard messages and per-shard message logs.
pub mod message;

pub use block::{Block, BlockHash, Header};
pub use message::{Message, MessageLog};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (BLAKE3-256).
///
/// This type is used as the backing representation for all fixed-size hashes
/// in the chain (block hashes, proposer identifiers). It is always exactly
/// [`HASH_LEN`] bytes long and is serialized as a lowercase hex string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the BLAKE3-256 hash of `data`.
    ///
    /// The result is deterministic for a given byte slice and is suitable
    /// for use as an identifier or content hash, but it is **not**
    /// a password hash or KDF.
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        Hash256(*h.as_bytes())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex encoding of the hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Error returned when parsing a [`Hash256`] from its hex form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("expected 32-byte hash, got {0} bytes")]
    InvalidLength(usize),
}

impl FromStr for Hash256 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| HashParseError::InvalidHex)?;
        if bytes.len() != HASH_LEN {
            return Err(HashParseError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; HASH_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Hash256(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of the account that proposed a block.
///
/// Fork choice never interprets it; it only keeps otherwise identical
/// sibling blocks from hashing to the same [`BlockHash`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Hash256);

impl AccountId {
    /// Derives an [`AccountId`] from a public key (or any stable seed).
    pub fn from_public_key(pk_bytes: &[u8]) -> Self {
        AccountId(Hash256::compute(pk_bytes))
    }

    /// Returns the underlying [`Hash256`] backing this account identifier.
    pub fn as_hash(&self) -> &Hash256 {
        &self.0
    }
}

/// Identifier of a shard.
///
/// Shards form a tree through each block's `parent_shard`; the root shard's
/// blocks carry no parent.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShardId(pub u16);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed set of shard identifiers a node recognizes.
///
/// Every per-shard mapping that enters fork choice is checked against the
/// registry, so an unknown shard id is rejected once at the boundary rather
/// than looked up and missed deep inside the recursion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShardRegistry {
    ids: BTreeSet<ShardId>,
}

impl ShardRegistry {
    pub fn new(ids: impl IntoIterator<Item = ShardId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, shard: ShardId) -> bool {
        self.ids.contains(&shard)
    }

    /// Recognized shards in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<ShardId> for ShardRegistry {
    fn from_iter<I: IntoIterator<Item = ShardId>>(iter: I) -> Self {
        Self::new(iter)
    }
}
