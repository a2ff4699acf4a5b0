// shardchain/src/types/block.rs

//! Block types and hashing.
//!
//! This module defines the core block data structures used by the sharded
//! chain, together with a canonical hashing routine and builder helpers
//! for extending a shard's chain.
//!
//! Serialization is done with **bincode 2** using the `serde` integration
//! (`bincode::serde::encode_to_vec`) and an explicit `standard()` config.
//! The same canonical encoding is used everywhere we need block bytes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AccountId, Hash256, Message, MessageLog, ShardId};

/// Strongly-typed block hash.
///
/// This is the content hash of a [`Block`], computed as a BLAKE3-256
/// digest over the canonical bincode-2 serialization of the block. It is
/// the canonical block identifier: every index, cache key and tie-break
/// in fork choice is expressed in terms of it.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHash(pub Hash256);

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Block header: linking and ordering fields.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Shard this block belongs to.
    pub shard: ShardId,

    /// Shard this block's shard hangs under in the shard tree.
    ///
    /// `None` for blocks of the root shard. Distinct from `prev`.
    pub parent_shard: Option<ShardId>,

    /// Preceding block in the same shard's chain (`None` at shard genesis).
    pub prev: Option<BlockHash>,

    /// Height of this block, 0 at shard genesis.
    pub height: u64,

    /// Wall-clock timestamp of the block, in seconds since Unix epoch.
    ///
    /// Only used for observability; fork choice ignores it.
    pub timestamp: u64,

    /// Account that proposed this block.
    pub proposer: AccountId,
}

/// Block = header + cross-shard view.
///
/// Besides the header, a block records the most recent block it
/// references in other shards (`sources`) and the cumulative logs of
/// messages its chain has sent to and received from each other shard.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    /// Most recently cross-linked block per other shard.
    #[serde(default)]
    pub sources: BTreeMap<ShardId, BlockHash>,
    /// Messages sent by this chain, keyed by destination shard.
    #[serde(default)]
    pub sent_log: MessageLog,
    /// Messages received by this chain, keyed by origin shard.
    #[serde(default)]
    pub received_log: MessageLog,
}

impl Block {
    /// Creates the first block of a shard's chain.
    pub fn genesis(
        shard: ShardId,
        parent_shard: Option<ShardId>,
        proposer: AccountId,
        timestamp: u64,
    ) -> Self {
        Self {
            header: Header {
                shard,
                parent_shard,
                prev: None,
                height: 0,
                timestamp,
                proposer,
            },
            sources: BTreeMap::new(),
            sent_log: MessageLog::new(),
            received_log: MessageLog::new(),
        }
    }

    /// Creates a block extending `prev` in the same shard.
    ///
    /// Sources and message logs are inherited, so the new block starts
    /// with exactly its predecessor's cross-shard view.
    pub fn child_of(prev: &Block) -> Self {
        Self {
            header: Header {
                shard: prev.header.shard,
                parent_shard: prev.header.parent_shard,
                prev: Some(prev.compute_hash()),
                height: prev.header.height + 1,
                timestamp: prev.header.timestamp + 1,
                proposer: prev.header.proposer,
            },
            sources: prev.sources.clone(),
            sent_log: prev.sent_log.clone(),
            received_log: prev.received_log.clone(),
        }
    }

    /// Records `source` as the latest block seen in `shard`.
    pub fn with_source(mut self, shard: ShardId, source: BlockHash) -> Self {
        self.sources.insert(shard, source);
        self
    }

    /// Appends an outgoing message addressed to `to`.
    pub fn send(mut self, to: ShardId, message: Message) -> Self {
        self.sent_log.push(to, message);
        self
    }

    /// Records receipt of a message that originated in `from`.
    pub fn receive(mut self, from: ShardId, message: Message) -> Self {
        self.received_log.push(from, message);
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    pub fn with_proposer(mut self, proposer: AccountId) -> Self {
        self.header.proposer = proposer;
        self
    }

    pub fn shard(&self) -> ShardId {
        self.header.shard
    }

    pub fn parent_shard(&self) -> Option<ShardId> {
        self.header.parent_shard
    }

    pub fn prev(&self) -> Option<&BlockHash> {
        self.header.prev.as_ref()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Latest block this block references in `shard`, if any.
    pub fn source(&self, shard: ShardId) -> Option<&BlockHash> {
        self.sources.get(&shard)
    }

    /// Messages to `shard` that this block originates itself.
    ///
    /// Logs are cumulative, so these are the entries of `sent_log[shard]`
    /// past the length of the predecessor's log. Pass `None` for a shard-genesis block (or a
    /// predecessor outside the known universe); every entry is then new.
    pub fn newly_sent<'a>(&'a self, prev: Option<&Block>, shard: ShardId) -> Vec<&'a Message> {
        let sent = self.sent_log.messages(shard);
        let inherited = prev.map_or(0, |p| p.sent_log.messages(shard).len());
        sent.get(inherited..).unwrap_or_default().iter().collect()
    }

    /// Returns the canonical byte representation of this block.
    ///
    /// This uses **bincode 2** with the `standard()` configuration and
    /// the `serde` integration. All hashing that depends on a "canonical"
    /// form should go through this method to avoid format drift.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails. This is considered a programming
    /// error, because all fields are required to be serializable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Explicit config to avoid relying on any implicit defaults.
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg)
            .expect("Block should always be serializable with bincode 2 + serde")
    }

    /// Computes a canonical BLAKE3-256 hash for this block.
    ///
    /// The block is serialized with [`bincode`] v2 using
    /// [`Block::canonical_bytes`] and the resulting bytes are hashed
    /// with [`Hash256::compute`]. This must remain stable across nodes
    /// for fork choice to agree on tie-breaks.
    pub fn compute_hash(&self) -> BlockHash {
        let bytes = self.canonical_bytes();
        BlockHash(Hash256::compute(&bytes))
    }
}
