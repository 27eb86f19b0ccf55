//! End-to-End Tests for the Shielded Pool
//!
//! This crate drives complete flows across the crates:
//! - The `prover` client that builds notes and proofs
//! - The `pool` state machine that verifies and applies them
//! - A mock omni bridge standing in for the cross-chain relay

#[cfg(test)]
mod tests;
