use crate::{
    error::BundlerError,
    types::{UserOpReceipt, UserOperation},
};
use alloy::{
    primitives::{Address, B256, ChainId},
    rpc::client::RpcClient,
};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::trace;

/// An ERC-4337 bundler for a single chain.
#[async_trait]
pub trait Bundler: Debug + Send + Sync {
    /// The chain this bundler submits to.
    fn chain_id(&self) -> ChainId;

    /// Submits a signed operation, returning its user operation hash.
    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entrypoint: Address,
    ) -> Result<B256, BundlerError>;

    /// Returns the receipt of an operation, or `None` while it is not yet included.
    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOpReceipt>, BundlerError>;
}

/// JSON-RPC bundler client.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    chain_id: ChainId,
    client: RpcClient,
}

impl BundlerClient {
    /// Creates a new client for the bundler of `chain_id`.
    pub fn new(chain_id: ChainId, client: RpcClient) -> Self {
        Self { chain_id, client }
    }
}

#[async_trait]
impl Bundler for BundlerClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entrypoint: Address,
    ) -> Result<B256, BundlerError> {
        trace!(chain_id = self.chain_id, sender = %op.sender, "Sending user operation");
        Ok(self.client.request("eth_sendUserOperation", (op.clone(), entrypoint)).await?)
    }

    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOpReceipt>, BundlerError> {
        Ok(self.client.request("eth_getUserOperationReceipt", (user_op_hash,)).await?)
    }
}
