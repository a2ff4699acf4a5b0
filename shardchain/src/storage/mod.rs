//! Storage backends for the chain.
//!
//! This module provides concrete implementations of the
//! [`crate::consensus::store::BlockStore`] trait. Fork choice only ever
//! reads from a frozen snapshot, so the one backend is the in-memory
//! [`mem::BlockUniverse`].

pub mod mem;

pub use mem::BlockUniverse;
