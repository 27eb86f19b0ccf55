//! Proof capability for the transaction circuits
//!
//! The pool and the client never talk to a proving system directly. They go
//! through [`ProofSystem`], keyed by [`CircuitId`], so a Groth16 backend and
//! the [`ReferenceBackend`] are interchangeable without touching pool logic.
//!
//! Public inputs are always passed in the circuit order produced by
//! [`contract_types::PublicInputs::to_field_elements`].

use ark_bn254::Fr;
use contract_types::CircuitId;
use pool_utils::{EntropyError, HashError};
use thiserror::Error;

pub mod reference;
pub mod witness;

pub use reference::ReferenceBackend;
pub use witness::{InputWitness, OutputWitness, TransactionWitness};

/// Errors produced while proving or verifying
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ProverError {
    /// Witness note counts do not match the circuit
    #[error("{circuit:?} expects its full arity, got {inputs} inputs and {outputs} outputs")]
    ArityMismatch {
        /// Circuit requested
        circuit: CircuitId,
        /// Input notes supplied
        inputs: usize,
        /// Output notes supplied
        outputs: usize,
    },
    /// The public inputs length does not match the circuit
    #[error("expected {expected} public inputs, got {actual}")]
    MalformedPublicInputs {
        /// Count required by the circuit
        expected: usize,
        /// Count supplied
        actual: usize,
    },
    /// A non-zero input does not open to the claimed root
    #[error("input {0} is not in the tree at the claimed root")]
    UnknownInput(usize),
    /// An input nullifier does not match its note
    #[error("nullifier of input {0} does not match the note")]
    NullifierMismatch(usize),
    /// Two inputs share a nullifier
    #[error("duplicate input nullifier")]
    DuplicateNullifier,
    /// An output commitment does not match its note
    #[error("commitment of output {0} does not match the note")]
    CommitmentMismatch(usize),
    /// An output amount does not fit in 248 bits
    #[error("amount of output {0} is out of range")]
    AmountOutOfRange(usize),
    /// The external data does not hash to the public input
    #[error("external data does not match its public hash")]
    ExtDataMismatch,
    /// A full withdrawal leaves value in an output
    #[error("output {0} keeps value in a full withdrawal")]
    RemainderNotZero(usize),
    /// `sum(inputs) + publicAmount != sum(outputs)`
    #[error("inputs plus public amount do not equal outputs")]
    ValueNotConserved,
    /// Hash evaluation failed
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Randomness unavailable during setup
    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

/// Prove/verify capability for the transaction circuits
pub trait ProofSystem: Send + Sync {
    /// Produce a proof that `witness` satisfies `circuit`
    fn prove(&self, circuit: CircuitId, witness: &TransactionWitness) -> Result<Vec<u8>, ProverError>;

    /// Check `proof` against `public_inputs` for `circuit`
    ///
    /// Returns `Ok(false)` for a well-formed but invalid proof.
    fn verify(&self, circuit: CircuitId, proof: &[u8], public_inputs: &[Fr]) -> Result<bool, ProverError>;
}
