//! Transaction proof envelope

use ark_bn254::Fr;
use parity_scale_codec::{Decode, Encode, EncodeLike, Input, Output};

use crate::codec::{WireField, from_wire_fields, wire_fields};

/// Transaction circuits, keyed by arity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CircuitId {
    /// 2 inputs, 2 outputs
    Transaction2,
    /// 16 inputs, 16 outputs
    Transaction16,
}

impl CircuitId {
    /// Number of input notes the circuit consumes
    pub const fn inputs(self) -> usize {
        match self {
            CircuitId::Transaction2 => 2,
            CircuitId::Transaction16 => 16,
        }
    }

    /// Number of output notes the circuit creates
    pub const fn outputs(self) -> usize {
        self.inputs()
    }

    /// Public signal count: root, public amount, ext data hash, nullifiers, commitments
    pub const fn public_input_count(self) -> usize {
        3 + self.inputs() + self.outputs()
    }

    /// Stable identifier byte
    pub const fn tag(self) -> u8 {
        match self {
            CircuitId::Transaction2 => 2,
            CircuitId::Transaction16 => 16,
        }
    }

    /// Circuit whose arity is exactly `(inputs, outputs)`
    pub fn for_arity(inputs: usize, outputs: usize) -> Option<Self> {
        [CircuitId::Transaction2, CircuitId::Transaction16]
            .into_iter()
            .find(|c| c.inputs() == inputs && c.outputs() == outputs)
    }

    /// Smallest circuit able to hold `inputs` and `outputs` after padding
    pub fn smallest_fitting(inputs: usize, outputs: usize) -> Option<Self> {
        [CircuitId::Transaction2, CircuitId::Transaction16]
            .into_iter()
            .find(|c| inputs <= c.inputs() && outputs <= c.outputs())
    }
}

/// Public inputs of the transaction circuit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    /// Merkle root the proof was generated against
    pub root: Fr,
    /// `ext_amount - fee` modulo the field
    pub public_amount: Fr,
    /// Hash of the external data (binds proof to transaction parameters)
    pub ext_data_hash: Fr,
    /// Nullifiers for spent input notes
    pub input_nullifiers: Vec<Fr>,
    /// Commitments for the created output notes
    pub output_commitments: Vec<Fr>,
}

impl PublicInputs {
    /// Public inputs in the order expected by the transaction circuit:
    /// `[root, publicAmount, extDataHash, inputNullifier..., outputCommitment...]`
    pub fn to_field_elements(&self) -> Vec<Fr> {
        let mut out =
            Vec::with_capacity(3 + self.input_nullifiers.len() + self.output_commitments.len());
        out.push(self.root);
        out.push(self.public_amount);
        out.push(self.ext_data_hash);
        out.extend_from_slice(&self.input_nullifiers);
        out.extend_from_slice(&self.output_commitments);
        out
    }

    /// Circuit matching the nullifier and commitment counts
    pub fn circuit(&self) -> Option<CircuitId> {
        CircuitId::for_arity(self.input_nullifiers.len(), self.output_commitments.len())
    }
}

/// Zero-knowledge proof data for a transaction
///
/// Built by the proof coordinator, consumed once by the pool.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Proof {
    /// The serialized proof
    pub proof: Vec<u8>,
    /// Public inputs the proof attests to
    pub public: PublicInputs,
}

// Field order on the wire follows the struct, not the circuit order
impl Encode for PublicInputs {
    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        WireField(self.root).encode_to(dest);
        WireField(self.public_amount).encode_to(dest);
        WireField(self.ext_data_hash).encode_to(dest);
        wire_fields(&self.input_nullifiers).encode_to(dest);
        wire_fields(&self.output_commitments).encode_to(dest);
    }
}

impl EncodeLike for PublicInputs {}

impl Decode for PublicInputs {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        Ok(Self {
            root: WireField::decode(input)?.0,
            public_amount: WireField::decode(input)?.0,
            ext_data_hash: WireField::decode(input)?.0,
            input_nullifiers: from_wire_fields(Vec::decode(input)?),
            output_commitments: from_wire_fields(Vec::decode(input)?),
        })
    }
}
