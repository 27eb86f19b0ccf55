//! Shielded pool client
//!
//! Everything a pool user runs locally:
//! - Keypairs and notes (commitments, nullifiers)
//! - Note encryption so recipients can discover their outputs
//! - Proof preparation against the pool's commitment tree
//! - Scanning pool events for owned notes
//!
//! # Architecture
//! Proving goes through [`tx_verifier::ProofSystem`]; the tree is read through
//! [`contract_types::CommitmentTree`]. Nothing here depends on the pool itself.

pub mod coordinator;
pub mod encryption;
pub mod error;
pub mod keypair;
pub mod note;
pub mod scanner;

pub use coordinator::{PreparedTransaction, TransactionRequest, prepare_transaction, verify_transaction};
pub use error::Error;
pub use keypair::Keypair;
pub use note::Note;
pub use scanner::NoteScanner;
