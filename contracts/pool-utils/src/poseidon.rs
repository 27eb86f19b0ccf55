//! Poseidon hash functions
//!
//! Circom-compatible Poseidon over the BN254 scalar field. Every hash in the
//! protocol goes through here so the pool, the client and the circuit
//! backend agree on the exact same relations:
//!
//! ```text
//! publicKey  = H(privateKey)
//! commitment = H(amount, publicKey, blinding)
//! signature  = H(privateKey, commitment, pathIndex)
//! nullifier  = H(commitment, pathIndex, signature)
//! node       = H(left, right)
//! ```

use ark_bn254::Fr;
use ark_ff::MontFp;
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};
use thiserror::Error;

/// Poseidon hashing failed
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("poseidon hash failed: {0}")]
pub struct HashError(String);

impl From<PoseidonError> for HashError {
    fn from(e: PoseidonError) -> Self {
        HashError(e.to_string())
    }
}

/// Value of an empty leaf
///
/// `keccak256("tornado") mod p`, kept so empty trees have the same roots as
/// existing deployments of this pool design.
pub const ZERO_VALUE: Fr =
    MontFp!("21663839004416932945382355908790599225266501822907911457504978515578255421292");

/// Hash an arbitrary number of field elements (1 to 12)
pub fn poseidon_hash(inputs: &[Fr]) -> Result<Fr, HashError> {
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())?;
    Ok(hasher.hash(inputs)?)
}

/// Hash two tree nodes into their parent
pub fn hash_pair(left: Fr, right: Fr) -> Result<Fr, HashError> {
    poseidon_hash(&[left, right])
}

/// Get the zero hash values for each level of a Merkle tree
///
/// Returns `levels + 1` values: index 0 is [`ZERO_VALUE`], index `i + 1` is
/// the root of an empty subtree of height `i + 1`.
pub fn zeroes(levels: u32) -> Result<Vec<Fr>, HashError> {
    let mut out = Vec::with_capacity(usize::try_from(levels).unwrap_or(0).saturating_add(1));
    let mut current = ZERO_VALUE;
    out.push(current);
    for _ in 0..levels {
        current = hash_pair(current, current)?;
        out.push(current);
    }
    Ok(out)
}

/// Note public key from its private key
pub fn derive_public_key(private_key: Fr) -> Result<Fr, HashError> {
    poseidon_hash(&[private_key])
}

/// Note commitment
pub fn commitment(amount: Fr, public_key: Fr, blinding: Fr) -> Result<Fr, HashError> {
    poseidon_hash(&[amount, public_key, blinding])
}

/// Spend authorization over a commitment at a given leaf position
pub fn sign(private_key: Fr, commitment: Fr, path_index: Fr) -> Result<Fr, HashError> {
    poseidon_hash(&[private_key, commitment, path_index])
}

/// Nullifier of a commitment at a given leaf position
pub fn nullifier(commitment: Fr, path_index: Fr, signature: Fr) -> Result<Fr, HashError> {
    poseidon_hash(&[commitment, path_index, signature])
}

/// Root reached by folding `siblings` into `leaf` at `leaf_index`
pub fn merkle_root_from_path(leaf: Fr, leaf_index: u64, siblings: &[Fr]) -> Result<Fr, HashError> {
    let mut current = leaf;
    let mut index = leaf_index;
    for sibling in siblings {
        current = if index & 1 == 0 {
            hash_pair(current, *sibling)?
        } else {
            hash_pair(*sibling, current)?
        };
        index >>= 1;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::PrimeField;

    #[test]
    fn hash_pair_is_deterministic_and_order_sensitive() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_eq!(hash_pair(a, b), hash_pair(a, b));
        assert_ne!(hash_pair(a, b), hash_pair(b, a));
    }

    #[test]
    fn matches_circomlib_vector() {
        // poseidon([1, 2]) from circomlibjs
        let expected = Fr::from_be_bytes_mod_order(
            &hex::decode("115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a").expect("hex"),
        );
        assert_eq!(hash_pair(Fr::from(1u64), Fr::from(2u64)), Ok(expected));
    }

    #[test]
    fn zeroes_chain_up() {
        let z = zeroes(3).expect("zeroes");
        assert_eq!(z.len(), 4);
        assert_eq!(z[0], ZERO_VALUE);
        assert_eq!(Ok(z[3]), hash_pair(z[2], z[2]));
    }

    #[test]
    fn path_folding_respects_index_bits() {
        let leaf = Fr::from(7u64);
        let siblings = [Fr::from(11u64), Fr::from(13u64)];
        let left_left = merkle_root_from_path(leaf, 0, &siblings).expect("root");
        let expected = hash_pair(hash_pair(leaf, siblings[0]).expect("h"), siblings[1]).expect("h");
        assert_eq!(left_left, expected);

        let right_right = merkle_root_from_path(leaf, 3, &siblings).expect("root");
        let expected = hash_pair(siblings[1], hash_pair(siblings[0], leaf).expect("h")).expect("h");
        assert_eq!(right_right, expected);
    }

    #[test]
    fn nullifier_depends_on_position() {
        let private_key = Fr::from(3u64);
        let public_key = derive_public_key(private_key).expect("pk");
        let c = commitment(Fr::from(10u64), public_key, Fr::from(99u64)).expect("commitment");
        let at = |i: u64| {
            let sig = sign(private_key, c, Fr::from(i)).expect("sig");
            nullifier(c, Fr::from(i), sig).expect("nullifier")
        };
        assert_eq!(at(4), at(4));
        assert_ne!(at(4), at(5));
    }
}
