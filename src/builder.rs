//! Operation builder.

use crate::{
    accounts::AccountResolver,
    error::TransferError,
    types::{ISmartAccount, UnsignedOperation, UserOperation},
};
use alloy::{
    primitives::{Address, Bytes, ChainId, U256},
    sol_types::SolCall,
};
use std::sync::Arc;
use tracing::debug;

/// Builds unsigned user operations for the resolved smart account of a chain.
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    accounts: Arc<dyn AccountResolver>,
}

impl OperationBuilder {
    /// Creates a new builder.
    pub fn new(accounts: Arc<dyn AccountResolver>) -> Self {
        Self { accounts }
    }

    /// Builds an operation calling `target` with `calldata` from the account on `chain_id`.
    ///
    /// The nonce uses a random 192-bit sequence key, so operations of one batch never wait on
    /// each other at the entrypoint.
    pub async fn build(
        &self,
        chain_id: ChainId,
        target: Address,
        calldata: Bytes,
    ) -> Result<UnsignedOperation, TransferError> {
        if calldata.is_empty() {
            return Err(TransferError::EmptyCalldata { chain_id, target });
        }

        let account = self.accounts.resolve(chain_id).await?;
        let op = UserOperation {
            sender: account.address,
            nonce: random_nonce(),
            initCode: Bytes::new(),
            callData: ISmartAccount::executeCall {
                dest: target,
                value: U256::ZERO,
                func: calldata.clone(),
            }
            .abi_encode()
            .into(),
            callGasLimit: account.gas.call_gas_limit,
            verificationGasLimit: account.gas.verification_gas_limit,
            preVerificationGas: account.gas.pre_verification_gas,
            maxFeePerGas: account.gas.max_fee_per_gas,
            maxPriorityFeePerGas: account.gas.max_priority_fee_per_gas,
            paymasterAndData: Bytes::new(),
            signature: Bytes::new(),
        };

        debug!(chain_id, %target, sender = %op.sender, "Built user operation");

        Ok(UnsignedOperation::new(chain_id, account.entrypoint, target, calldata, op))
    }
}

/// A nonce with a random sequence key and sequence number 0.
fn random_nonce() -> U256 {
    let key: [u8; 24] = rand::random();
    U256::from_be_slice(&key) << 64
}
