use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Receipt returned by `eth_getUserOperationReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOpReceipt {
    /// Hash of the user operation.
    pub user_op_hash: B256,
    /// The smart account that executed it.
    pub sender: Address,
    /// Whether the inner call succeeded.
    pub success: bool,
    /// Gas cost paid by the sponsor.
    #[serde(default)]
    pub actual_gas_cost: U256,
    /// Gas used by the operation.
    #[serde(default)]
    pub actual_gas_used: U256,
    /// Revert reason, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The bundle transaction that included the operation.
    pub receipt: InclusionReceipt,
}

/// The subset of the bundle transaction receipt we keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionReceipt {
    /// Hash of the bundle transaction.
    pub transaction_hash: B256,
    /// Block the bundle transaction was included in.
    #[serde(with = "alloy::serde::quantity")]
    pub block_number: u64,
}
