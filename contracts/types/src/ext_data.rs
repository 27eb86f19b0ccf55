//! External transaction data
//!
//! Public parameters of a transaction that live outside the circuit. Their
//! hash is a public input, so none of them can be changed once the proof
//! exists.

use ark_bn254::Fr;
use parity_scale_codec::{Decode, Encode};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::field::signed_to_fr;

/// External data for a transaction
///
/// Contains public information about the transaction that is hashed and
/// included in the zero-knowledge proof to bind the proof to specific
/// transaction parameters (e.g. recipient address).
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct ExtData {
    /// Recipient address for withdrawals
    pub recipient: Address,
    /// External amount: positive for deposits, negative for withdrawals
    pub ext_amount: i128,
    /// Relayer receiving `fee`
    pub relayer: Address,
    /// Relayer fee, paid by the pool on top of the withdrawn amount
    pub fee: u128,
    /// Route the withdrawal through the omni bridge to the settlement chain
    pub is_l1_withdrawal: bool,
    /// Fee charged on the settlement chain for unwrapping an L1 withdrawal
    pub l1_fee: u128,
    /// Every output note has a zero amount, so nothing is left behind.
    /// The proof attests to it, which lifts the minimum withdrawal.
    pub is_full_withdrawal: bool,
    /// Encrypted data for each output note, in commitment order
    pub encrypted_outputs: Vec<Vec<u8>>,
}

impl ExtData {
    /// Canonical encoding as a standalone byte string
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    /// Hash bound into the proof's public inputs
    ///
    /// SHA-256 of the SCALE encoding, reduced modulo the BN254 field.
    pub fn hash(&self) -> Fr {
        let digest = Sha256::digest(self.to_bytes());
        <Fr as ark_ff::PrimeField>::from_be_bytes_mod_order(&digest)
    }

    /// `ext_amount - fee` as the circuit sees it
    pub fn public_amount(&self) -> Fr {
        calculate_public_amount(self.ext_amount, self.fee)
    }
}

/// Calculate the public amount from external amount and fee
///
/// Computes `public_amount = ext_amount - fee` in the BN254 field. Negative
/// results wrap to `FIELD_SIZE - |public_amount|`.
pub fn calculate_public_amount(ext_amount: i128, fee: u128) -> Fr {
    signed_to_fr(ext_amount) - Fr::from(fee)
}
