//! Shared utilities for the shielded pool
//!
//! This crate provides common functions and collaborators that are reused
//! across the pool, the verifier backend and the client:
//!
//! - Poseidon hashing for tree nodes, commitments and nullifiers
//! - The process-wide randomness source
//! - The token collaborator interface and an in-memory ledger

pub mod entropy;
pub mod poseidon;
pub mod token;

pub use entropy::{EntropyError, random_bytes, random_field};
pub use poseidon::*;
pub use token::{MemoryToken, Token, TokenError};
