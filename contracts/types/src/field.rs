//! BN254 scalar field encoding
//!
//! Field elements travel as 32-byte big-endian strings. Decoding is strict:
//! a value that is not reduced modulo the field is rejected instead of being
//! silently wrapped, so two different byte strings never decode to the same
//! element.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use thiserror::Error;

/// Size in bytes of a serialized field element
pub const FIELD_SIZE: usize = 32;

/// Errors raised while decoding field elements
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum FieldError {
    /// Input did not have exactly [`FIELD_SIZE`] bytes
    #[error("field element must be {FIELD_SIZE} bytes, got {0}")]
    WrongLength(usize),
    /// Input encodes an integer greater than or equal to the field modulus
    #[error("field element is not reduced modulo the BN254 scalar field")]
    NonCanonical,
}

/// Serialize a field element as 32 big-endian bytes
pub fn fr_to_bytes(value: &Fr) -> [u8; FIELD_SIZE] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_SIZE];
    let offset = FIELD_SIZE.saturating_sub(bytes.len());
    out[offset..].copy_from_slice(&bytes[..FIELD_SIZE.min(bytes.len())]);
    out
}

/// Deserialize a canonical 32-byte big-endian field element
pub fn fr_from_bytes(bytes: &[u8]) -> Result<Fr, FieldError> {
    if bytes.len() != FIELD_SIZE {
        return Err(FieldError::WrongLength(bytes.len()));
    }
    let value = Fr::from_be_bytes_mod_order(bytes);
    if fr_to_bytes(&value).as_slice() != bytes {
        return Err(FieldError::NonCanonical);
    }
    Ok(value)
}

/// Hex encoding of a field element, used in logs and addresses
pub fn fr_to_hex(value: &Fr) -> String {
    hex::encode(fr_to_bytes(value))
}

/// Interpret a field element as an unsigned 128-bit integer
///
/// Returns `None` when the element does not fit, e.g. for the field
/// encoding of a negative amount.
pub fn fr_to_u128(value: &Fr) -> Option<u128> {
    let bytes = fr_to_bytes(value);
    let (high, low) = bytes.split_at(FIELD_SIZE / 2);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    Some(u128::from_be_bytes(buf))
}

/// Map a signed integer into the field, negative values wrapping to `p - |v|`
pub fn signed_to_fr(value: i128) -> Fr {
    let magnitude = Fr::from(value.unsigned_abs());
    if value < 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, Zero};

    #[test]
    fn bytes_round_trip_small_values() {
        let value = Fr::from(0x0102_0304u64);
        let bytes = fr_to_bytes(&value);
        assert_eq!(bytes[28..], [1, 2, 3, 4]);
        assert_eq!(fr_from_bytes(&bytes), Ok(value));
    }

    #[test]
    fn rejects_modulus_and_wrong_length() {
        let modulus = Fr::MODULUS.to_bytes_be();
        assert_eq!(fr_from_bytes(&modulus), Err(FieldError::NonCanonical));
        assert_eq!(fr_from_bytes(&[0u8; 31]), Err(FieldError::WrongLength(31)));
    }

    #[test]
    fn negative_values_wrap_around_modulus() {
        let minus_one = signed_to_fr(-1);
        assert_eq!(minus_one + Fr::one(), Fr::zero());
        assert_eq!(fr_to_u128(&minus_one), None);
        assert_eq!(fr_to_u128(&signed_to_fr(42)), Some(42));
    }
}
