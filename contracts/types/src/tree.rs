//! Read-only view of the commitment accumulator

use ark_bn254::Fr;

/// Sibling path from a leaf to the root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    /// Position of the leaf; its bits select left/right at each level
    pub leaf_index: u64,
    /// Sibling hashes, leaf level first
    pub siblings: Vec<Fr>,
}

/// What a proof builder needs from the accumulator
///
/// Implemented by the pool and by its Merkle tree. All methods observe the
/// current tree only.
pub trait CommitmentTree {
    /// Tree height
    fn levels(&self) -> u32;
    /// Current root
    fn root(&self) -> Fr;
    /// Index of `commitment` if it has been inserted
    fn leaf_index(&self, commitment: &Fr) -> Option<u64>;
    /// Path for an inserted leaf
    fn path(&self, leaf_index: u64) -> Option<MerklePath>;
}
