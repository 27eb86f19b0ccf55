//! Events published by the pool
//!
//! Events are the only way off-chain observers learn about new notes, so the
//! encrypted outputs travel with their commitments and leaf positions.

use ark_bn254::Fr;

use crate::address::Address;

/// A commitment appended to the tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCommitment {
    /// The commitment hash added to the tree
    pub commitment: Fr,
    /// Index position in the Merkle tree
    pub index: u64,
    /// Encrypted output data (decryptable by the recipient)
    pub encrypted_output: Vec<u8>,
}

/// Emitted once per accepted transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionAccepted {
    /// Root after the commitments were inserted
    pub root: Fr,
    /// Nullifiers marked as spent
    pub nullifiers: Vec<Fr>,
    /// Commitments inserted, in leaf order
    pub commitments: Vec<NewCommitment>,
}

/// Everything the pool publishes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    /// A transaction was applied
    TransactionAccepted(TransactionAccepted),
    /// A user published an encryption key so others can send them notes
    PublicKeyRegistered {
        /// Address of the account owner
        owner: Address,
        /// Public key material (see the client keypair address format)
        key: Vec<u8>,
    },
    /// Tokens were handed to the omni bridge for delivery on the settlement chain
    L1WithdrawalRequested {
        /// Final recipient on the settlement chain
        recipient: Address,
        /// Contract unwrapping the bridged tokens
        unwrapper: Address,
        /// Amount handed to the bridge
        amount: u128,
        /// Fee paid out of `amount` on the settlement chain
        l1_fee: u128,
    },
}

impl PoolEvent {
    /// The transaction payload, if this is a [`PoolEvent::TransactionAccepted`]
    pub fn as_transaction(&self) -> Option<&TransactionAccepted> {
        match self {
            PoolEvent::TransactionAccepted(tx) => Some(tx),
            _ => None,
        }
    }
}
