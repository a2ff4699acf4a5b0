use thiserror::Error;

use crate::types::{BlockHash, ShardId};

/// Error type returned when a block fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Block is invalid according to a validity predicate.
    #[error("invalid block: {0}")]
    Invalid(&'static str),
    /// Block is invalid with a dynamic error message.
    #[error("invalid block: {0}")]
    Custom(String),
}

/// A precondition on the inputs of a fork-choice computation does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("shard {0} is not a recognized shard")]
    UnknownShard(ShardId),
    #[error("no starting block given for shard {0}")]
    MissingStartingBlock(ShardId),
    #[error("more than one starting block given for shard {0}")]
    DuplicateStartingBlock(ShardId),
    #[error("starting block {block} of shard {shard} is not in the block universe")]
    StartingBlockNotInUniverse { shard: ShardId, block: BlockHash },
    #[error("starting block {block} keyed by shard {shard} belongs to shard {actual}")]
    StartingBlockShardMismatch {
        shard: ShardId,
        block: BlockHash,
        actual: ShardId,
    },
    #[error("weighted block {0} is not in the block universe")]
    VoteNotInUniverse(BlockHash),
    #[error("weighted block {0} carries a non-positive weight")]
    NonPositiveWeight(BlockHash),
    #[error("block {0} is weighted more than once")]
    DuplicateVote(BlockHash),
    #[error("block {block} failed validity: {reason}")]
    InvalidBlock {
        block: BlockHash,
        reason: ValidationError,
    },
    #[error("block {block} of shard {shard} does not share the shard's parent shard")]
    ParentShardMismatch { shard: ShardId, block: BlockHash },
    #[error("message base {base} referenced by block {block} is not in the block universe")]
    UnknownMessageBase { block: BlockHash, base: BlockHash },
}

/// An internal contract of the fork-choice computation was broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("walk started from excluded block {0}")]
    StartExcluded(BlockHash),
    #[error("cyclic shard hierarchy: {}", display_path(.0))]
    ShardCycle(Vec<ShardId>),
    #[error("resolved tip {0} is missing from the block universe")]
    MissingTip(BlockHash),
}

/// High-level errors that can occur while resolving fork choice.
///
/// Every variant aborts the resolution call; no partial tips are returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkChoiceError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] InvariantViolation),
}

fn display_path(path: &[ShardId]) -> String {
    path.iter()
        .map(ShardId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_renders_the_offending_path() {
        let err: ForkChoiceError =
            InvariantViolation::ShardCycle(vec![ShardId(1), ShardId(2), ShardId(1)]).into();
        assert_eq!(
            err.to_string(),
            "invariant violation: cyclic shard hierarchy: 1 -> 2 -> 1"
        );
    }

    #[test]
    fn validation_error_is_wrapped_with_block_context() {
        let err = InvalidInput::InvalidBlock {
            block: BlockHash(crate::types::Hash256([0u8; 32])),
            reason: ValidationError::Invalid("ttl must be positive"),
        };
        assert!(err.to_string().ends_with("invalid block: ttl must be positive"));
    }
}
