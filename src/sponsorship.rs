//! Fee sponsorship.

use crate::{
    accounts::AccountResolver,
    error::{SponsorshipError, TransferError},
    types::UnsignedOperation,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Routes operations to the sponsor of their chain.
#[derive(Debug, Clone)]
pub struct SponsorshipResolver {
    accounts: Arc<dyn AccountResolver>,
}

impl SponsorshipResolver {
    /// Creates a new resolver.
    pub fn new(accounts: Arc<dyn AccountResolver>) -> Self {
        Self { accounts }
    }

    /// Obtains sponsorship for `op` and attaches it.
    ///
    /// Operations that are already sponsored are returned unchanged without contacting the
    /// sponsor. A successful response without paymaster data counts as a decline.
    #[instrument(skip_all, fields(chain_id = op.chain_id, sender = %op.sender()))]
    pub async fn sponsor(&self, op: UnsignedOperation) -> Result<UnsignedOperation, TransferError> {
        if op.is_sponsored() {
            return Ok(op);
        }

        let account = self.accounts.resolve(op.chain_id).await?;
        let sponsor = account.sponsor;
        if sponsor.chain_id() != op.chain_id {
            return Err(SponsorshipError::ChainMismatch {
                operation: op.chain_id,
                sponsor: sponsor.chain_id(),
            }
            .into());
        }

        let data = sponsor.sponsor(&op.op).await.inspect_err(|err| {
            warn!(%err, "Sponsorship failed");
        })?;

        if data.paymaster_and_data.is_empty() {
            return Err(SponsorshipError::Declined {
                chain_id: op.chain_id,
                reason: "empty paymaster data".to_string(),
            }
            .into());
        }

        debug!(paymaster_and_data = %data.paymaster_and_data, "Operation sponsored");
        Ok(op.with_sponsorship(data))
    }
}
