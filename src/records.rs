//! Record-keeping service client.
//!
//! Completed transfers are reported to an external HTTP service which also serves the transfer
//! history of a wallet. The service is advisory: its failures never fail a transfer.

use crate::{error::RecordError, types::TransferRecord};
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, instrument};
use url::Url;

/// Persists transfer records and serves a wallet's history.
#[async_trait]
pub trait RecordKeeper: Debug + Send + Sync {
    /// Persists a record.
    async fn save(&self, record: &TransferRecord) -> Result<(), RecordError>;

    /// Returns every record of `wallet`, oldest first.
    async fn history(&self, wallet: Address) -> Result<Vec<TransferRecord>, RecordError>;
}

/// Response of `GET api/fetch-transactions`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    #[serde(default)]
    all_transactions: Vec<TransferRecord>,
}

/// [`RecordKeeper`] talking to the record-keeping HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRecordKeeper {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRecordKeeper {
    /// Creates a client for the service at `base_url`.
    pub fn new(client: reqwest::Client, mut base_url: Url) -> Self {
        // relative joins drop the last segment unless the path ends in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    /// The normalized base url.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RecordError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RecordError::Status { status: status.as_u16(), body })
    }
}

#[async_trait]
impl RecordKeeper for HttpRecordKeeper {
    #[instrument(skip_all, fields(wallet = %record.wallet_address))]
    async fn save(&self, record: &TransferRecord) -> Result<(), RecordError> {
        let url = self.base_url.join("api/save-transactions")?;
        debug!(%url, "Saving transfer record");
        let response = self.client.post(url).json(record).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn history(&self, wallet: Address) -> Result<Vec<TransferRecord>, RecordError> {
        let mut url = self.base_url.join("api/fetch-transactions")?;
        url.query_pairs_mut().append_pair("walletAddress", &wallet.to_string());

        let response = self.client.get(url).send().await?;
        let history: HistoryResponse = Self::check(response).await?.json().await?;
        debug!(records = history.all_transactions.len(), "Fetched transfer history");
        Ok(history.all_transactions)
    }
}
