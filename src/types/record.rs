use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the destination transfer of a recorded transfer went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
    /// The deliver step confirmed.
    Confirmed,
    /// The deliver step failed. The record only reflects the requested amount.
    Failed,
}

/// A transfer as stored by the record-keeping service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    /// Smart account that sent the transfer.
    pub wallet_address: Address,
    /// Receiver on the destination chain.
    pub receiver_address: Address,
    /// Amount delivered on the destination chain, in token base units.
    #[serde(rename = "amountSend", with = "crate::serde::amount")]
    pub amount_sent: U256,
    /// When the record was created.
    #[serde(alias = "createdAt", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Delivery outcome. Missing for records written by other clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryStatus>,
}

impl TransferRecord {
    /// Creates a record timestamped now.
    pub fn new(
        wallet_address: Address,
        receiver_address: Address,
        amount_sent: U256,
        delivery: DeliveryStatus,
    ) -> Self {
        Self {
            wallet_address,
            receiver_address,
            amount_sent,
            timestamp: Utc::now(),
            delivery: Some(delivery),
        }
    }
}
