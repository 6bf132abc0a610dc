//! Merkle tree over user operation leaves.
//!
//! Node hashing uses sorted pairs, `keccak256(min(a, b) ‖ max(a, b))`, and odd layers are padded
//! with a zero node, so proofs verify with OpenZeppelin's `MerkleProof.verify`.

use crate::error::MerkleError;
use alloy::primitives::{B256, keccak256};

/// A fully materialized merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// Layers from the leaves (index 0) up to the root.
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Builds a tree over the given leaves.
    pub fn new(leaves: Vec<B256>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut layers = vec![leaves];
        while let Some(layer) = layers.last()
            && layer.len() > 1
        {
            let next = layer
                .chunks(2)
                .map(|pair| hash_pair(pair[0], pair.get(1).copied().unwrap_or_default()))
                .collect();
            layers.push(next);
        }

        Ok(Self { layers })
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    /// Whether the tree has no leaves. Always false for a constructed tree.
    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// The root. For a single leaf this is the leaf itself.
    pub fn root(&self) -> B256 {
        self.layers.last().and_then(|layer| layer.first()).copied().unwrap_or_default()
    }

    /// Sibling hashes from the leaf at `index` up to the root.
    pub fn proof(&self, index: usize) -> Result<Vec<B256>, MerkleError> {
        if index >= self.len() {
            return Err(MerkleError::IndexOutOfBounds { index, leaves: self.len() });
        }

        let mut idx = index;
        let proof = self.layers[..self.layers.len() - 1]
            .iter()
            .map(|layer| {
                let sibling = layer.get(idx ^ 1).copied().unwrap_or_default();
                idx /= 2;
                sibling
            })
            .collect();
        Ok(proof)
    }

    /// Verifies that `leaf` is part of a tree with the given `root`.
    pub fn verify(root: B256, leaf: B256, proof: &[B256]) -> bool {
        proof.iter().fold(leaf, |node, sibling| hash_pair(node, *sibling)) == root
    }
}

fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}
