//! Wire encoding
//!
//! Transaction structs derive SCALE `Encode`/`Decode`. Field elements travel
//! as their 32-byte compressed arkworks serialization, which rejects
//! non-canonical values on the way back in. The same encoding feeds the
//! external data hash and the bridge payload.

use ark_bn254::Fr;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use parity_scale_codec::{Decode, Encode, Input, Output};
use thiserror::Error;

use crate::field::FIELD_SIZE;

/// Errors raised while decoding
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CodecError {
    /// Bytes left over after the last expected value
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
    /// Magic bytes did not match
    #[error("unrecognised payload tag")]
    BadMagic,
    /// Version byte is missing or not supported by this decoder
    #[error("unsupported payload version {0:?}")]
    UnsupportedVersion(Option<u8>),
    /// The body is not a valid encoding
    #[error("{0}")]
    Malformed(String),
}

impl From<parity_scale_codec::Error> for CodecError {
    fn from(e: parity_scale_codec::Error) -> Self {
        CodecError::Malformed(e.to_string())
    }
}

/// A field element in its wire form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireField(pub Fr);

impl Encode for WireField {
    fn size_hint(&self) -> usize {
        FIELD_SIZE
    }

    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        let mut bytes = Vec::with_capacity(FIELD_SIZE);
        // Writing into a Vec cannot fail
        let _ = self.0.serialize_compressed(&mut bytes);
        dest.write(&bytes);
    }
}

impl parity_scale_codec::EncodeLike for WireField {}

impl Decode for WireField {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let bytes = <[u8; FIELD_SIZE]>::decode(input)?;
        Fr::deserialize_compressed(&bytes[..])
            .map(WireField)
            .map_err(|_| "non-canonical field element".into())
    }
}

/// Wire form of a list of field elements
pub fn wire_fields(values: &[Fr]) -> Vec<WireField> {
    values.iter().copied().map(WireField).collect()
}

/// Field elements back from their wire form
pub fn from_wire_fields(values: Vec<WireField>) -> Vec<Fr> {
    values.into_iter().map(|f| f.0).collect()
}
