//! Batch signing across chains.
//!
//! The multichain validation module accepts one owner personal-message signature over a merkle
//! root and checks, per operation, that `keccak256(validUntil ‖ validAfter ‖ userOpHash)` is a
//! leaf of that root. Each operation therefore carries the root, its own proof and the shared
//! signature:
//!
//! ```text
//! abi.encode(
//!     abi.encode(validUntil, validAfter, merkleRoot, merkleProof, signature),
//!     validationModule
//! )
//! ```

use super::PayloadSigner;
use crate::{
    error::SigningError,
    types::{MerkleTree, MultichainSignature, SignedOperation, UnsignedOperation},
};
use alloy::{
    primitives::{Address, B256, Bytes, ChainId, aliases::U48, keccak256},
    sol_types::SolValue,
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

/// Signs batches of sponsored operations with a single signer call.
#[derive(Debug, Clone)]
pub struct MultiChainSigner {
    signer: Arc<dyn PayloadSigner>,
    validation_module: Address,
    validity: Duration,
}

impl MultiChainSigner {
    /// Creates a new signer. A zero `validity` produces signatures without expiry.
    pub fn new(
        signer: Arc<dyn PayloadSigner>,
        validation_module: Address,
        validity: Duration,
    ) -> Self {
        Self { signer, validation_module, validity }
    }

    /// The owner address.
    pub fn owner(&self) -> Address {
        self.signer.address()
    }

    /// Signs all operations of the batch, or none.
    ///
    /// Every entry must be sponsored and tagged with the chain it was built for. The output has
    /// the same order as the input.
    #[instrument(skip_all, fields(batch_size = batch.len(), owner = %self.owner()))]
    pub async fn sign_batch(
        &self,
        batch: Vec<(UnsignedOperation, ChainId)>,
    ) -> Result<Vec<SignedOperation>, SigningError> {
        if batch.is_empty() {
            return Err(SigningError::EmptyBatch);
        }

        for (index, (op, chain_id)) in batch.iter().enumerate() {
            if op.chain_id != *chain_id {
                return Err(SigningError::ChainMismatch {
                    index,
                    expected: *chain_id,
                    actual: op.chain_id,
                });
            }
            if !op.is_sponsored() {
                return Err(SigningError::Unsponsored { index, chain_id: op.chain_id });
            }
        }

        let valid_after = 0u64;
        let valid_until = if self.validity.is_zero() {
            0
        } else {
            Utc::now().timestamp().max(0) as u64 + self.validity.as_secs()
        };

        let tree = MerkleTree::new(
            batch.iter().map(|(op, _)| leaf(valid_until, valid_after, op.hash())).collect(),
        )?;
        let root = tree.root();

        let signature = self.signer.sign_payload_hash(root).await.map_err(SigningError::Rejected)?;
        debug!(%root, valid_until, "Signed batch root");

        batch
            .into_iter()
            .enumerate()
            .map(|(index, (op, _))| -> Result<_, SigningError> {
                let module_signature = MultichainSignature {
                    validUntil: U48::from(valid_until),
                    validAfter: U48::from(valid_after),
                    merkleRoot: root,
                    merkleProof: tree.proof(index)?,
                    signature: signature.clone(),
                };
                let encoded: Bytes = (
                    Bytes::from(module_signature.abi_encode_params()),
                    self.validation_module,
                )
                    .abi_encode_params()
                    .into();
                Ok(SignedOperation::new(op, encoded))
            })
            .collect()
    }
}

/// Merkle leaf of one operation: `keccak256(uint48 validUntil ‖ uint48 validAfter ‖ userOpHash)`.
pub fn leaf(valid_until: u64, valid_after: u64, user_op_hash: B256) -> B256 {
    let mut buf = [0u8; 44];
    buf[..6].copy_from_slice(&valid_until.to_be_bytes()[2..]);
    buf[6..12].copy_from_slice(&valid_after.to_be_bytes()[2..]);
    buf[12..].copy_from_slice(user_op_hash.as_slice());
    keccak256(buf)
}
