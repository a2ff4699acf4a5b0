//! Block validity predicates for the chain.
//!
//! This module implements concrete block validators that plug into the
//! fork-choice layer via [`crate::consensus::validator::BlockValidator`].
//!
//! It currently provides:
//!
//! - [`base::BaseValidity`]: cheap structural checks against the
//!   recognized shard set.

pub mod base;

pub use base::BaseValidity;
