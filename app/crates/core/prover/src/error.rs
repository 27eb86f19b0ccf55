//! Client-side errors

use pool_utils::{EntropyError, HashError};
use thiserror::Error;
use tx_verifier::ProverError;

/// Errors raised while building notes and transactions
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// An amount or a sum of amounts is not representable
    #[error("amount is not representable")]
    InvalidAmount,
    /// A note to spend has no position in the tree
    #[error("note is not in the commitment tree")]
    NoteNotInserted,
    /// A spend or decryption was attempted with a public-only keypair
    #[error("keypair has no private key")]
    MissingPrivateKey,
    /// More notes than the largest circuit supports
    #[error("{inputs} inputs and {outputs} outputs exceed every circuit")]
    ArityMismatch {
        /// Input notes requested
        inputs: usize,
        /// Output notes requested
        outputs: usize,
    },
    /// Inputs plus the public amount do not equal outputs
    #[error("inputs plus public amount do not equal outputs")]
    UnbalancedValue,
    /// The encrypted output was not encrypted to this keypair or is malformed
    #[error("encrypted output is not addressed to this keypair")]
    NotAddressedToMe,
    /// Note encryption failed
    #[error("note encryption failed")]
    EncryptionFailed,
    /// A keypair address string could not be parsed
    #[error("invalid keypair address: {0}")]
    InvalidAddress(String),
    /// Proof generation or verification failed
    #[error(transparent)]
    Prover(#[from] ProverError),
    /// Hashing failed
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Randomness unavailable
    #[error(transparent)]
    Entropy(#[from] EntropyError),
}
