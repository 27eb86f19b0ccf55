//! Proof coordinator
//!
//! Turns a set of notes to spend and notes to create into a proof the pool
//! accepts. Handles:
//! - Circuit selection (2x2 or 16x16) and padding with zero-amount notes
//! - External amount derivation and value-conservation checks
//! - Merkle paths for the spent notes
//! - Output encryption and the external data bound into the proof
//! - Marking withdrawals that leave no value behind as full withdrawals
//!
//! Paths and root are read from the given [`CommitmentTree`]. When the tree
//! is live and shared, pass a snapshot so they describe the same tree state;
//! a root that has left the pool's history window is answered with
//! `UnknownRoot` and the transaction must be rebuilt.

use ark_bn254::Fr;
use contract_types::{Address, CircuitId, CommitmentTree, ExtData, Proof, PublicInputs};
use tx_verifier::{InputWitness, OutputWitness, ProofSystem, TransactionWitness};

use crate::error::Error;
use crate::note::Note;

/// What the sender wants the transaction to do
#[derive(Clone, Debug, Default)]
pub struct TransactionRequest {
    /// Notes to spend; must be in the tree unless their amount is zero
    pub inputs: Vec<Note>,
    /// Notes to create
    pub outputs: Vec<Note>,
    /// Withdrawal recipient
    pub recipient: Address,
    /// Fixed external amount; derived from the notes when `None`
    pub ext_amount: Option<i128>,
    /// Relayer receiving `fee`
    pub relayer: Address,
    /// Relayer fee
    pub fee: u128,
    /// Route a withdrawal to the settlement chain
    pub is_l1_withdrawal: bool,
    /// Settlement chain unwrapping fee
    pub l1_fee: u128,
}

/// A transaction ready to submit
#[derive(Clone, Debug)]
pub struct PreparedTransaction {
    /// Circuit the proof was produced for
    pub circuit: CircuitId,
    /// Proof and public inputs
    pub proof: Proof,
    /// External data bound into the proof
    pub ext_data: ExtData,
    /// Created notes including padding, in commitment order
    pub outputs: Vec<Note>,
}

/// Build and prove a transaction
///
/// # Arguments
///
/// * `tree` - Source of the root and of the spent notes' paths
/// * `prover` - Proof system producing the proof
/// * `request` - Notes and public parameters of the transaction
///
/// # Returns
///
/// The proof with its external data, or the first violated precondition
pub fn prepare_transaction(
    tree: &dyn CommitmentTree,
    prover: &dyn ProofSystem,
    request: TransactionRequest,
) -> Result<PreparedTransaction, Error> {
    let TransactionRequest {
        mut inputs,
        mut outputs,
        recipient,
        ext_amount,
        relayer,
        fee,
        is_l1_withdrawal,
        l1_fee,
    } = request;

    // 1. Pick the circuit and pad both sides with zero notes
    let circuit = CircuitId::smallest_fitting(inputs.len(), outputs.len()).ok_or(
        Error::ArityMismatch {
            inputs: inputs.len(),
            outputs: outputs.len(),
        },
    )?;
    while inputs.len() < circuit.inputs() {
        inputs.push(Note::padding()?.at_index(0));
    }
    while outputs.len() < circuit.outputs() {
        outputs.push(Note::padding()?);
    }

    // 2. Value balance
    let sum_ins = checked_sum(&inputs)?;
    let sum_outs = checked_sum(&outputs)?;
    let ext_amount = balance(sum_ins, sum_outs, fee, ext_amount)?;

    // 3. Input witnesses with paths for real notes
    let levels = usize::try_from(tree.levels()).map_err(|_| Error::NoteNotInserted)?;
    let mut input_witnesses = Vec::with_capacity(inputs.len());
    let mut input_nullifiers = Vec::with_capacity(inputs.len());
    for note in inputs {
        let private_key = note.keypair().private_key().ok_or(Error::MissingPrivateKey)?;
        let (path_index, path_elements) = if note.amount() > 0 {
            let index = tree
                .leaf_index(&note.commitment())
                .ok_or(Error::NoteNotInserted)?;
            let path = tree.path(index).ok_or(Error::NoteNotInserted)?;
            (index, path.siblings)
        } else {
            (note.index().unwrap_or(0), vec![Fr::from(0u64); levels])
        };
        input_nullifiers.push(note.nullifier_at(path_index)?);
        input_witnesses.push(InputWitness {
            amount: Fr::from(note.amount()),
            private_key,
            blinding: note.blinding(),
            path_index,
            path_elements,
        });
    }

    // 4. Encrypted outputs and external data
    let encrypted_outputs = outputs
        .iter()
        .map(Note::encrypt)
        .collect::<Result<Vec<_>, _>>()?;
    let ext_data = ExtData {
        recipient,
        ext_amount,
        relayer,
        fee,
        is_l1_withdrawal,
        l1_fee,
        is_full_withdrawal: ext_amount < 0 && sum_outs == 0,
        encrypted_outputs,
    };

    // 5. Public inputs and witness
    let public = PublicInputs {
        root: tree.root(),
        public_amount: ext_data.public_amount(),
        ext_data_hash: ext_data.hash(),
        input_nullifiers,
        output_commitments: outputs.iter().map(Note::commitment).collect(),
    };
    let witness = TransactionWitness {
        public,
        inputs: input_witnesses,
        outputs: outputs
            .iter()
            .map(|note| OutputWitness {
                amount: Fr::from(note.amount()),
                public_key: note.keypair().public_key(),
                blinding: note.blinding(),
            })
            .collect(),
        ext_data,
    };

    // 6. Prove
    let proof_bytes = prover.prove(circuit, &witness)?;
    log::debug!(
        "prepared {circuit:?} transaction: in {sum_ins}, out {sum_outs}, ext amount {ext_amount}"
    );

    Ok(PreparedTransaction {
        circuit,
        proof: Proof {
            proof: proof_bytes,
            public: witness.public,
        },
        ext_data: witness.ext_data,
        outputs,
    })
}

/// Check a proof against its own public inputs
///
/// The circuit is chosen from the nullifier and commitment counts.
pub fn verify_transaction(prover: &dyn ProofSystem, proof: &Proof) -> Result<bool, Error> {
    let circuit = proof.public.circuit().ok_or(Error::ArityMismatch {
        inputs: proof.public.input_nullifiers.len(),
        outputs: proof.public.output_commitments.len(),
    })?;
    Ok(prover.verify(circuit, &proof.proof, &proof.public.to_field_elements())?)
}

fn checked_sum(notes: &[Note]) -> Result<u128, Error> {
    notes.iter().try_fold(0u128, |acc, note| {
        acc.checked_add(note.amount()).ok_or(Error::InvalidAmount)
    })
}

/// External amount that balances `sum_ins + (ext_amount - fee) == sum_outs`
fn balance(sum_ins: u128, sum_outs: u128, fee: u128, pinned: Option<i128>) -> Result<i128, Error> {
    let ins = i128::try_from(sum_ins).map_err(|_| Error::InvalidAmount)?;
    let outs = i128::try_from(sum_outs).map_err(|_| Error::InvalidAmount)?;
    let fee = i128::try_from(fee).map_err(|_| Error::InvalidAmount)?;
    let required = outs
        .checked_add(fee)
        .and_then(|v| v.checked_sub(ins))
        .ok_or(Error::InvalidAmount)?;
    match pinned {
        Some(ext_amount) if ext_amount != required => Err(Error::UnbalancedValue),
        _ => Ok(required),
    }
}
