//! Merkle tree error types.

use thiserror::Error;

/// Errors that can occur while building a merkle tree or its proofs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// The tree has no leaves.
    #[error("cannot build a merkle tree without leaves")]
    EmptyTree,
    /// Leaf index out of bounds.
    #[error("leaf index {index} out of bounds (tree has {leaves} leaves)")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of leaves in the tree.
        leaves: usize,
    },
}
