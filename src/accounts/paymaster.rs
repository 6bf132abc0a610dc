use crate::{
    constants::{SMART_ACCOUNT_NAME, SMART_ACCOUNT_VERSION, SPONSORED_MODE},
    error::SponsorshipError,
    types::{SponsorshipData, UserOperation},
};
use alloy::{
    primitives::ChainId,
    rpc::client::RpcClient,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A fee sponsor for a single chain.
#[async_trait]
pub trait Sponsor: Debug + Send + Sync {
    /// The chain this sponsor pays on.
    fn chain_id(&self) -> ChainId;

    /// Asks the sponsor to pay for `op`.
    async fn sponsor(&self, op: &UserOperation) -> Result<SponsorshipData, SponsorshipError>;
}

/// Sponsorship request context sent along with the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipContext {
    /// Sponsorship mode.
    pub mode: String,
    /// Let the paymaster compute gas limits.
    pub calculate_gas_limits: bool,
    /// The smart account implementation.
    pub smart_account_info: SmartAccountInfo,
}

impl Default for SponsorshipContext {
    fn default() -> Self {
        Self {
            mode: SPONSORED_MODE.to_string(),
            calculate_gas_limits: true,
            smart_account_info: SmartAccountInfo {
                name: SMART_ACCOUNT_NAME.to_string(),
                version: SMART_ACCOUNT_VERSION.to_string(),
            },
        }
    }
}

/// Smart account implementation reported to the paymaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartAccountInfo {
    /// Implementation name.
    pub name: String,
    /// Implementation version.
    pub version: String,
}

/// JSON-RPC paymaster client speaking `pm_sponsorUserOperation`.
#[derive(Debug, Clone)]
pub struct PaymasterClient {
    chain_id: ChainId,
    client: RpcClient,
    context: SponsorshipContext,
}

impl PaymasterClient {
    /// Creates a new client for the paymaster of `chain_id`.
    pub fn new(chain_id: ChainId, client: RpcClient, context: SponsorshipContext) -> Self {
        Self { chain_id, client, context }
    }
}

#[async_trait]
impl Sponsor for PaymasterClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn sponsor(&self, op: &UserOperation) -> Result<SponsorshipData, SponsorshipError> {
        let chain_id = self.chain_id;
        self.client
            .request::<_, SponsorshipData>(
                "pm_sponsorUserOperation",
                (op.clone(), self.context.clone()),
            )
            .await
            .map_err(|err: RpcError<TransportErrorKind>| match err {
                RpcError::ErrorResp(payload) => {
                    SponsorshipError::Declined { chain_id, reason: payload.message.to_string() }
                }
                other => SponsorshipError::Unavailable { chain_id, reason: other.to_string() },
            })
    }
}
