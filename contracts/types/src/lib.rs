//! Shared types for the shielded pool
//!
//! This crate holds the data model that crosses crate boundaries: the pool
//! state machine, the client-side proof coordinator and the bridge relay all
//! speak in these types.
//!
//! - [`Address`] identifies accounts known to the token collaborator
//! - [`ExtData`] is the public transaction metadata bound into every proof
//! - [`Proof`] and [`PublicInputs`] form the transaction proof envelope
//! - [`CommitmentTree`] is the read-only view of the accumulator used to build proofs
//! - [`PoolEvent`] is the only channel through which recipients learn about notes

pub mod address;
pub mod codec;
pub mod events;
pub mod ext_data;
pub mod field;
pub mod proof;
pub mod tree;

pub use address::Address;
pub use codec::{CodecError, WireField};
pub use events::{NewCommitment, PoolEvent, TransactionAccepted};
pub use ext_data::{ExtData, calculate_public_amount};
pub use field::{FIELD_SIZE, FieldError, fr_from_bytes, fr_to_bytes, fr_to_hex, fr_to_u128};
pub use proof::{CircuitId, Proof, PublicInputs};
pub use tree::{CommitmentTree, MerklePath};

/// BN254 scalar field element used for every public input
pub use ark_bn254::Fr;
