//! Block validity predicates consulted by fork choice.

use crate::types::Block;

use super::error::ValidationError;

/// Pluggable validity predicate for blocks.
///
/// Implementations should be deterministic and side-effect free. Fork
/// choice does not decide validity itself; it refuses to run on inputs
/// that any configured predicate rejects.
pub trait BlockValidator {
    fn validate(&self, block: &Block) -> Result<(), ValidationError>;

    /// Boolean form of [`BlockValidator::validate`].
    fn is_valid(&self, block: &Block) -> bool {
        self.validate(block).is_ok()
    }
}

/// A trivial validator that accepts every block.
///
/// Useful for tests and for isolating fork-choice logic from the real
/// validity predicates.
pub struct AcceptAllValidator;

impl BlockValidator for AcceptAllValidator {
    fn validate(&self, _block: &Block) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// A validator that composes two other validators.
///
/// `CombinedValidator { first, second }` runs `first.validate` and then
/// `second.validate`, failing fast on the first error.
pub struct CombinedValidator<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> CombinedValidator<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> BlockValidator for CombinedValidator<A, B>
where
    A: BlockValidator,
    B: BlockValidator,
{
    fn validate(&self, block: &Block) -> Result<(), ValidationError> {
        self.first.validate(block)?;
        self.second.validate(block)?;
        Ok(())
    }
}
