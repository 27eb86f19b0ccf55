//! Constraint-checking reference backend
//!
//! Evaluates every relation of the transaction circuit natively and, when
//! they all hold, seals the public inputs with a keyed SHA-256 tag. The tag
//! is neither succinct nor zero-knowledge; it gives the pool a sound
//! accept/reject decision wherever compiled circuit artifacts are not
//! available. Verification recomputes the tag from the public inputs.
//!
//! # Checked relations
//!
//! For every input `i`:
//! - `publicKey = H(privateKey)`, `commitment = H(amount, publicKey, blinding)`
//! - if `amount != 0`, the path opens `commitment` to `root`
//! - `nullifier[i] = H(commitment, pathIndex, H(privateKey, commitment, pathIndex))`
//!
//! For every output `j`: `commitment[j] = H(amount, publicKey, blinding)` and
//! `amount < 2^248`. Nullifiers are pairwise distinct and
//! `sum(inputs) + publicAmount == sum(outputs)`.
//!
//! The external data must hash to `extDataHash`. When it is marked as a full
//! withdrawal every output amount must be zero.

use ark_bn254::Fr;
use ark_ff::Zero;
use contract_types::{CircuitId, fr_to_bytes};
use pool_utils::{commitment, derive_public_key, merkle_root_from_path, nullifier, random_bytes, sign};
use sha2::{Digest, Sha256};

use crate::witness::TransactionWitness;
use crate::{ProofSystem, ProverError};

const SEAL_DOMAIN: &[u8] = b"shielded-pool/reference-proof/v1";

/// Size of a reference proof in bytes
pub const PROOF_SIZE: usize = 32;

/// Constraint-checking backend
#[derive(Clone)]
pub struct ReferenceBackend {
    key: [u8; 32],
}

impl core::fmt::Debug for ReferenceBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReferenceBackend").finish_non_exhaustive()
    }
}

impl ReferenceBackend {
    /// Backend with a fresh random sealing key
    ///
    /// Prover and verifier must share the instance (or its key).
    pub fn setup() -> Result<Self, ProverError> {
        Ok(Self::from_key(random_bytes::<32>()?))
    }

    /// Backend with a fixed sealing key
    pub fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn seal(&self, circuit: CircuitId, public_inputs: &[Fr]) -> [u8; PROOF_SIZE] {
        let mut hasher = Sha256::new();
        hasher.update(SEAL_DOMAIN);
        hasher.update(self.key);
        hasher.update([circuit.tag()]);
        for input in public_inputs {
            hasher.update(fr_to_bytes(input));
        }
        hasher.finalize().into()
    }

    /// Evaluate the circuit relations over `witness`
    pub fn check(circuit: CircuitId, witness: &TransactionWitness) -> Result<(), ProverError> {
        let public = &witness.public;
        if witness.inputs.len() != circuit.inputs()
            || witness.outputs.len() != circuit.outputs()
            || public.input_nullifiers.len() != circuit.inputs()
            || public.output_commitments.len() != circuit.outputs()
        {
            return Err(ProverError::ArityMismatch {
                circuit,
                inputs: witness.inputs.len(),
                outputs: witness.outputs.len(),
            });
        }

        if witness.ext_data.hash() != public.ext_data_hash {
            return Err(ProverError::ExtDataMismatch);
        }

        let mut sum_ins = Fr::zero();
        for (i, (input, expected)) in witness.inputs.iter().zip(&public.input_nullifiers).enumerate() {
            let public_key = derive_public_key(input.private_key)?;
            let note = commitment(input.amount, public_key, input.blinding)?;
            if !input.amount.is_zero() {
                let root = merkle_root_from_path(note, input.path_index, &input.path_elements)?;
                if root != public.root {
                    return Err(ProverError::UnknownInput(i));
                }
            }
            let path_index = Fr::from(input.path_index);
            let signature = sign(input.private_key, note, path_index)?;
            if nullifier(note, path_index, signature)? != *expected {
                return Err(ProverError::NullifierMismatch(i));
            }
            sum_ins += input.amount;
        }

        for (i, a) in public.input_nullifiers.iter().enumerate() {
            if public.input_nullifiers[i + 1..].contains(a) {
                return Err(ProverError::DuplicateNullifier);
            }
        }

        let mut sum_outs = Fr::zero();
        for (j, (output, expected)) in witness.outputs.iter().zip(&public.output_commitments).enumerate() {
            if fr_to_bytes(&output.amount)[0] != 0 {
                return Err(ProverError::AmountOutOfRange(j));
            }
            if witness.ext_data.is_full_withdrawal && !output.amount.is_zero() {
                return Err(ProverError::RemainderNotZero(j));
            }
            if commitment(output.amount, output.public_key, output.blinding)? != *expected {
                return Err(ProverError::CommitmentMismatch(j));
            }
            sum_outs += output.amount;
        }

        if sum_ins + public.public_amount != sum_outs {
            return Err(ProverError::ValueNotConserved);
        }
        Ok(())
    }
}

impl ProofSystem for ReferenceBackend {
    fn prove(&self, circuit: CircuitId, witness: &TransactionWitness) -> Result<Vec<u8>, ProverError> {
        Self::check(circuit, witness)?;
        log::debug!("reference proof sealed for {circuit:?}");
        Ok(self.seal(circuit, &witness.public.to_field_elements()).to_vec())
    }

    fn verify(&self, circuit: CircuitId, proof: &[u8], public_inputs: &[Fr]) -> Result<bool, ProverError> {
        if public_inputs.len() != circuit.public_input_count() {
            return Err(ProverError::MalformedPublicInputs {
                expected: circuit.public_input_count(),
                actual: public_inputs.len(),
            });
        }
        Ok(proof == self.seal(circuit, public_inputs).as_slice())
    }
}
