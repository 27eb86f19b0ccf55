//! Transaction circuit witness

use ark_bn254::Fr;
use contract_types::{ExtData, PublicInputs};

/// Private data for a spent note
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputWitness {
    /// Note amount
    pub amount: Fr,
    /// Owner's private key
    pub private_key: Fr,
    /// Note blinding
    pub blinding: Fr,
    /// Leaf position of the note
    pub path_index: u64,
    /// Sibling path, leaf level first
    pub path_elements: Vec<Fr>,
}

/// Private data for a created note
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputWitness {
    /// Note amount
    pub amount: Fr,
    /// Recipient's public key
    pub public_key: Fr,
    /// Note blinding
    pub blinding: Fr,
}

/// Full witness: public inputs plus the notes behind them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionWitness {
    /// Public inputs
    pub public: PublicInputs,
    /// One entry per input nullifier, same order
    pub inputs: Vec<InputWitness>,
    /// One entry per output commitment, same order
    pub outputs: Vec<OutputWitness>,
    /// External data hashed into `public.ext_data_hash`
    pub ext_data: ExtData,
}
