//! Transfer signers.

mod r#dyn;
use alloy::primitives::{Address, B256, Bytes};
pub use r#dyn::DynSigner;

mod multichain;
pub use multichain::MultiChainSigner;

/// Signer capability of the smart account owner.
#[async_trait::async_trait]
pub trait PayloadSigner: std::fmt::Debug + Send + Sync {
    /// The owner address the validation module checks signatures against.
    fn address(&self) -> Address;

    /// Signs a 32 byte payload hash, e.g. a batch merkle root, as an EIP-191 personal message
    /// over its 32 bytes, which is what the multichain validation module recovers from.
    ///
    /// Returns the 65 byte `r ‖ s ‖ v` signature as [`Bytes`].
    async fn sign_payload_hash(&self, payload_hash: B256) -> eyre::Result<Bytes>;
}
