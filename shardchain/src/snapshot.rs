//! JSON snapshots of fork-choice inputs.
//!
//! A [`ForkChoiceSnapshot`] bundles everything one resolution session
//! needs: the block set, the weighted votes, and a starting block per
//! shard. The CLI reads snapshots from disk and the HTTP gateway accepts
//! them as request bodies.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consensus::{
    BlockStore, ForkChoiceConfig, ForkChoiceError, ShardedResolver, StartingBlocks, TipsCache,
    WeightedVotes,
};
use crate::metrics::ForkChoiceMetrics;
use crate::storage::BlockUniverse;
use crate::types::{AccountId, Block, BlockHash, Message, ShardId};
use crate::validation::BaseValidity;

/// Weight attached to one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub block: BlockHash,
    pub weight: u64,
}

/// The block a shard's walk starts from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingBlock {
    pub shard: ShardId,
    pub block: BlockHash,
}

/// Resolved tip of one shard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTip {
    pub shard: ShardId,
    pub tip: BlockHash,
    pub height: u64,
}

/// Inputs of one fork-choice session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkChoiceSnapshot {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    pub starting_blocks: Vec<StartingBlock>,
}

/// Errors that can occur while loading or resolving a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    ForkChoice(#[from] ForkChoiceError),
}

impl ForkChoiceSnapshot {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Resolves the tip of every shard that has a starting block.
    ///
    /// Blocks are validated with [`BaseValidity`] against the configured
    /// shard set. Sibling shards are resolved concurrently when
    /// `config.parallel` is set. Tips come back in ascending shard order.
    pub fn resolve_tips(
        &self,
        config: &ForkChoiceConfig,
        metrics: Option<&ForkChoiceMetrics>,
    ) -> Result<Vec<ShardTip>, SnapshotError> {
        let registry = config.registry();
        let universe = BlockUniverse::new(self.blocks.iter().cloned());
        let votes = WeightedVotes::from_pairs(self.votes.iter().map(|v| (v.block, v.weight)))
            .map_err(ForkChoiceError::from)?;
        let starting = StartingBlocks::new(
            &registry,
            self.starting_blocks.iter().map(|s| (s.shard, s.block)),
        )
        .map_err(ForkChoiceError::from)?;
        let validator = BaseValidity::new(registry.clone());

        let mut resolver =
            ShardedResolver::new(&registry, &universe, &votes, &starting, &validator)?;
        if let Some(m) = metrics {
            resolver = resolver.with_metrics(m.clone());
        }

        let mut cache = TipsCache::new();
        let tips = if config.parallel {
            resolver.resolve_all_parallel(&mut cache)?
        } else {
            resolver.resolve_all(&mut cache)?
        };

        Ok(tips
            .into_iter()
            .map(|(shard, tip)| ShardTip {
                shard,
                tip,
                height: universe.get_block(&tip).map(Block::height).unwrap_or_default(),
            })
            .collect())
    }

    /// A small two-shard snapshot exercising cross-shard filtering.
    ///
    /// Shard 0 forks after its first block; the heavier branch wins. Shard
    /// 1 hangs below shard 0 and has one branch that references the losing
    /// parent branch, which is filtered out.
    pub fn demo() -> Self {
        const ROOT: ShardId = ShardId(0);
        const CHILD: ShardId = ShardId(1);
        let proposer = AccountId::from_public_key(b"demo-proposer");
        let rival = AccountId::from_public_key(b"demo-rival");

        let p0 = Block::genesis(ROOT, None, proposer, 1_700_000_000);
        let c0 = Block::genesis(CHILD, Some(ROOT), proposer, 1_700_000_000);

        let down = Message::new(c0.compute_hash(), 4, b"hello child".to_vec());
        let p1 = Block::child_of(&p0)
            .with_source(CHILD, c0.compute_hash())
            .send(CHILD, down.clone());
        let p1_fork = Block::child_of(&p0).with_proposer(rival);

        let up = Message::new(p1.compute_hash(), 8, b"hello parent".to_vec());
        let c1 = Block::child_of(&c0)
            .with_source(ROOT, p1.compute_hash())
            .send(ROOT, up.clone());
        let c1_fork = Block::child_of(&c0)
            .with_proposer(rival)
            .with_source(ROOT, p1_fork.compute_hash());
        let c2 = Block::child_of(&c1).receive(ROOT, down);
        let p2 = Block::child_of(&p1).receive(CHILD, up);

        let votes = vec![
            Vote {
                block: p2.compute_hash(),
                weight: 3,
            },
            Vote {
                block: p1_fork.compute_hash(),
                weight: 1,
            },
            Vote {
                block: c1_fork.compute_hash(),
                weight: 5,
            },
            Vote {
                block: c2.compute_hash(),
                weight: 2,
            },
        ];
        let starting_blocks = vec![
            StartingBlock {
                shard: ROOT,
                block: p0.compute_hash(),
            },
            StartingBlock {
                shard: CHILD,
                block: c0.compute_hash(),
            },
        ];

        Self {
            blocks: vec![p0, p1, p1_fork, p2, c0, c1, c1_fork, c2],
            votes,
            starting_blocks,
        }
    }
}
