use alloy::primitives::{Address, U256, wrap_fixed_bytes};
use serde::{Deserialize, Serialize};

wrap_fixed_bytes! {
    /// Identifies a transfer across invocations. Reusing an id resumes the transfer.
    pub struct TransferId<32>;
}

/// A request to move tokens from the route's source chain to a receiver on its destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Transfer id.
    pub id: TransferId,
    /// Receiver on the destination chain.
    pub receiver: Address,
    /// Amount approved and bridged on the source chain, in token base units.
    pub amount_from_source: U256,
    /// Amount transferred to the receiver on the destination chain, in token base units.
    pub amount_to_destination: U256,
}

impl TransferRequest {
    /// Creates a request with a random id.
    pub fn new(receiver: Address, amount_from_source: U256, amount_to_destination: U256) -> Self {
        Self { id: TransferId::random(), receiver, amount_from_source, amount_to_destination }
    }

    /// Sets the transfer id, e.g. to resume an earlier transfer.
    pub fn with_id(mut self, id: TransferId) -> Self {
        self.id = id;
        self
    }
}
