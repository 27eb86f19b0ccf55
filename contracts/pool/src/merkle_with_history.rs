//! Merkle Tree with History Module
//!
//! This module implements a fixed-depth binary Merkle tree with root history
//! for privacy-preserving transactions. It uses the circom Poseidon hash
//! function for ZK-circuit compatibility.
//!
//! - Maintains a ring buffer of recent roots for membership proof verification
//! - Stores every populated node so paths can be served for any inserted leaf
//! - Rejects commitments that are already in the tree
//!
//! This module is designed to be used internally by the pool. Authorization
//! and serialization of callers are handled by the pool before invoking these
//! functions.

use std::collections::HashMap;

use ark_bn254::Fr;
use ark_ff::Zero;
use contract_types::{CommitmentTree, MerklePath};
use pool_utils::{HashError, hash_pair, zeroes};
use thiserror::Error;

/// Default number of roots kept in history for proof verification
pub const ROOT_HISTORY_SIZE: u32 = 100;

/// Maximum supported tree height
pub const MAX_LEVELS: u32 = 32;

/// Batch sizes accepted by [`MerkleTreeWithHistory::insert_leaves`]
pub const BATCH_SIZES: [usize; 2] = [2, 16];

/// Merkle tree errors
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// Height outside `1..=32` or empty root history
    #[error("invalid tree configuration")]
    WrongLevels,
    /// Batch is neither 2 nor 16 leaves
    #[error("batch of {0} leaves is not a supported size")]
    WrongBatchSize(usize),
    /// Not enough free leaves for the batch
    #[error("merkle tree is full")]
    CapacityExceeded,
    /// A leaf of the batch is already in the tree or repeated in the batch
    #[error("commitment already inserted")]
    DuplicateCommitment,
    /// Node hashing failed
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Merkle Tree with root history for privacy-preserving transactions
///
/// Node layers only hold populated nodes; anything to the right of the last
/// populated node is the zero subtree of its level.
#[derive(Clone, Debug)]
pub struct MerkleTreeWithHistory {
    levels: u32,
    zeros: Vec<Fr>,
    layers: Vec<Vec<Fr>>,
    leaf_positions: HashMap<Fr, u64>,
    roots: Vec<Fr>,
    current_root_index: usize,
}

impl MerkleTreeWithHistory {
    /// Initialize the Merkle tree with history
    ///
    /// Creates an empty tree of the given height. The tree starts from the
    /// precomputed zero hashes and its initial root is the zero hash at the
    /// top level.
    ///
    /// # Arguments
    ///
    /// * `levels` - Number of levels in the Merkle tree (must be in range [1..32])
    /// * `root_history_size` - Number of recent roots accepted by [`Self::is_known_root`]
    pub fn init(levels: u32, root_history_size: u32) -> Result<Self, Error> {
        if levels == 0 || levels > MAX_LEVELS || root_history_size == 0 {
            return Err(Error::WrongLevels);
        }
        let zeros = zeroes(levels)?;
        let top = zeros.last().copied().ok_or(Error::WrongLevels)?;
        let history = usize::try_from(root_history_size).map_err(|_| Error::WrongLevels)?;
        let mut roots = vec![Fr::zero(); history];
        roots[0] = top;
        let depth = usize::try_from(levels).map_err(|_| Error::WrongLevels)?;

        Ok(Self {
            levels,
            zeros,
            layers: vec![Vec::new(); depth + 1],
            leaf_positions: HashMap::new(),
            roots,
            current_root_index: 0,
        })
    }

    /// Tree height
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Total number of leaves the tree can hold
    pub fn capacity(&self) -> u64 {
        1u64 << self.levels
    }

    /// Index the next inserted leaf will occupy
    pub fn next_index(&self) -> u64 {
        self.layers[0].len() as u64
    }

    /// Run every insertion check without touching the tree
    ///
    /// [`Self::insert_leaves`] succeeds for the same batch exactly when this
    /// returns `Ok`, barring hash failures.
    pub fn check_insert(&self, leaves: &[Fr]) -> Result<(), Error> {
        if !BATCH_SIZES.contains(&leaves.len()) {
            return Err(Error::WrongBatchSize(leaves.len()));
        }
        let free = self.capacity() - self.next_index();
        if (leaves.len() as u64) > free {
            return Err(Error::CapacityExceeded);
        }
        for (i, leaf) in leaves.iter().enumerate() {
            if self.leaf_positions.contains_key(leaf) || leaves[..i].contains(leaf) {
                return Err(Error::DuplicateCommitment);
            }
        }
        Ok(())
    }

    /// Append a batch of leaves
    ///
    /// Leaves land at consecutive indexes starting at [`Self::next_index`].
    /// Only the nodes above the new leaves are recomputed, so the work is
    /// proportional to the batch size times the height. The new root takes
    /// the next history slot; the previous root stays valid until it is
    /// overwritten `root_history_size` insertions later.
    ///
    /// # Returns
    ///
    /// The index of the first inserted leaf and the new root
    pub fn insert_leaves(&mut self, leaves: &[Fr]) -> Result<(u64, Fr), Error> {
        self.check_insert(leaves)?;
        let first = self.next_index();
        let last = first + leaves.len() as u64 - 1;

        // New nodes of each level, computed before anything is written
        let mut runs = Vec::with_capacity(self.layers.len());
        let mut fresh = leaves.to_vec();
        for level in 1..self.layers.len() {
            let start = first >> (level - 1);
            let child = |index: u64| {
                index
                    .checked_sub(start)
                    .and_then(|offset| usize::try_from(offset).ok())
                    .and_then(|offset| fresh.get(offset))
                    .copied()
                    .unwrap_or_else(|| node_at(&self.layers, &self.zeros, level - 1, index))
            };
            let parents = ((first >> level)..=(last >> level))
                .map(|index| hash_pair(child(index * 2), child(index * 2 + 1)))
                .collect::<Result<Vec<_>, _>>()?;
            runs.push((slot(start)?, std::mem::replace(&mut fresh, parents)));
        }
        // The top level is the single root node
        let root = fresh[0];
        runs.push((0, fresh));

        for (layer, (start, nodes)) in self.layers.iter_mut().zip(runs) {
            layer.truncate(start);
            layer.extend(nodes);
        }
        for (offset, leaf) in leaves.iter().enumerate() {
            self.leaf_positions.insert(*leaf, first + offset as u64);
        }
        self.current_root_index = (self.current_root_index + 1) % self.roots.len();
        self.roots[self.current_root_index] = root;
        log::debug!(
            "inserted {} leaves at {first}, root slot {}",
            leaves.len(),
            self.current_root_index
        );

        Ok((first, root))
    }

    /// Check if a root exists in the recent history
    ///
    /// Zero root always returns `false`.
    pub fn is_known_root(&self, root: &Fr) -> bool {
        // Zero root is never valid as empty slots hold zero
        if root.is_zero() {
            return false;
        }
        self.roots.contains(root)
    }

    /// Get the current Merkle root
    pub fn last_root(&self) -> Fr {
        self.roots[self.current_root_index]
    }

    /// Sibling path of an inserted leaf in the current tree
    ///
    /// `None` when `leaf_index` is at or beyond [`Self::next_index`].
    pub fn path_to(&self, leaf_index: u64) -> Option<MerklePath> {
        if leaf_index >= self.next_index() {
            return None;
        }
        let siblings = (0..self.layers.len() - 1)
            .map(|level| node_at(&self.layers, &self.zeros, level, (leaf_index >> level) ^ 1))
            .collect();
        Some(MerklePath {
            leaf_index,
            siblings,
        })
    }

    /// Index of an inserted commitment
    pub fn position_of(&self, commitment: &Fr) -> Option<u64> {
        self.leaf_positions.get(commitment).copied()
    }

    /// Zero hash values for each level, leaf level first
    pub fn zeros(&self) -> &[Fr] {
        &self.zeros
    }
}

fn slot(index: u64) -> Result<usize, Error> {
    usize::try_from(index).map_err(|_| Error::CapacityExceeded)
}

fn node_at(layers: &[Vec<Fr>], zeros: &[Fr], level: usize, index: u64) -> Fr {
    usize::try_from(index)
        .ok()
        .and_then(|i| layers[level].get(i))
        .copied()
        .unwrap_or(zeros[level])
}

impl CommitmentTree for MerkleTreeWithHistory {
    fn levels(&self) -> u32 {
        self.levels
    }

    fn root(&self) -> Fr {
        self.last_root()
    }

    fn leaf_index(&self, commitment: &Fr) -> Option<u64> {
        self.position_of(commitment)
    }

    fn path(&self, leaf_index: u64) -> Option<MerklePath> {
        self.path_to(leaf_index)
    }
}
