//! Cross-shard messages.
//!
//! A message travels from one shard to a neighbouring shard (parent or
//! child in the shard tree). It is filed in the sender's `sent_log` and,
//! once observed, in the receiver's `received_log`, both keyed by the
//! counterpart shard. Logs are cumulative along a chain: a block's log
//! carries every message recorded by its ancestry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BlockHash, ShardId};

/// A unit of cross-shard communication.
///
/// Two messages are the same message iff all fields match; that identity
/// is what "recorded as received" is checked against.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Block of the destination shard this message is anchored on.
    ///
    /// Expiry is measured against this block's height.
    pub base: BlockHash,
    /// Number of destination-shard height increments the message may stay
    /// undelivered.
    pub ttl: u64,
    /// Opaque application payload.
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(base: BlockHash, ttl: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            base,
            ttl,
            payload: payload.into(),
        }
    }

    /// First destination height at which the message counts as expired.
    pub fn deadline(&self, base_height: u64) -> u64 {
        base_height.saturating_add(self.ttl)
    }

    /// Returns `true` if an observer at `observer_height` is past the
    /// delivery deadline of a message whose base sits at `base_height`.
    pub fn is_expired_at(&self, base_height: u64, observer_height: u64) -> bool {
        observer_height >= self.deadline(base_height)
    }
}

/// Per-shard ordered collection of messages.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog(BTreeMap<ShardId, Vec<Message>>);

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages filed under `shard`, oldest first. Empty if none.
    pub fn messages(&self, shard: ShardId) -> &[Message] {
        self.0.get(&shard).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends `message` under `shard`.
    pub fn push(&mut self, shard: ShardId, message: Message) {
        self.0.entry(shard).or_default().push(message);
    }

    /// Shards that have at least one entry in this log.
    pub fn shards(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.0.keys().copied()
    }

    /// Iterates every `(shard, message)` pair in shard order.
    pub fn iter(&self) -> impl Iterator<Item = (ShardId, &Message)> + '_ {
        self.0
            .iter()
            .flat_map(|(shard, msgs)| msgs.iter().map(move |m| (*shard, m)))
    }

    pub fn contains(&self, shard: ShardId, message: &Message) -> bool {
        self.messages(shard).contains(message)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}
