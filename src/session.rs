//! Local session cache.
//!
//! The session remembers the owner, their smart accounts, the last balances and the last fetched
//! history between invocations. It is a cache only: before a transfer relies on it, it is checked
//! against live account resolution with [`Session::validate`].

use crate::{
    accounts::AccountResolver, balances::WalletBalances, constants::SESSION_VERSION,
    types::TransferRecord,
};
use alloy::primitives::{Address, ChainId};
use chrono::{DateTime, Utc};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};
use tracing::{debug, warn};

/// Cached user state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Format version.
    pub version: u32,
    /// The owner signing for the smart accounts.
    pub main_address: Address,
    /// Smart account per chain.
    pub accounts: BTreeMap<ChainId, Address>,
    /// Last read balances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<WalletBalances>,
    /// Last fetched transfer history.
    #[serde(default)]
    pub transactions: Vec<TransferRecord>,
    /// When the session was written.
    pub saved_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for `main_address` without balances or history.
    pub fn new(main_address: Address, accounts: BTreeMap<ChainId, Address>) -> Self {
        Self {
            version: SESSION_VERSION,
            main_address,
            accounts,
            balances: None,
            transactions: vec![],
            saved_at: Utc::now(),
        }
    }

    /// Replaces the cached balances.
    pub fn with_balances(mut self, balances: WalletBalances) -> Self {
        self.balances = Some(balances);
        self
    }

    /// Replaces the cached history.
    pub fn with_transactions(mut self, transactions: Vec<TransferRecord>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Checks that every cached account is still the account resolved for its chain.
    pub async fn validate(&self, resolver: &dyn AccountResolver) -> eyre::Result<()> {
        for (&chain_id, &cached) in &self.accounts {
            let account = resolver.resolve(chain_id).await?;
            if account.address != cached {
                eyre::bail!(
                    "cached account {cached} on chain {chain_id} does not match {}",
                    account.address
                );
            }
        }
        Ok(())
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Creates a store for the session file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the session.
    ///
    /// Returns `None` when there is no session, or when it cannot be read or has another version.
    pub async fn load(&self) -> Option<Session> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(%err, path = %self.path.display(), "Failed to read session");
                return None;
            }
        };

        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) if session.version == SESSION_VERSION => Some(session),
            Ok(session) => {
                warn!(version = session.version, "Discarding session with unknown version");
                None
            }
            Err(err) => {
                warn!(%err, path = %self.path.display(), "Discarding unreadable session");
                None
            }
        }
    }

    /// Writes the session, stamping it with the current time.
    pub async fn save(&self, session: &Session) -> eyre::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let session = Session { saved_at: Utc::now(), ..session.clone() };
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&session)?)
            .await
            .wrap_err_with(|| format!("failed to write session: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    /// Removes the session.
    pub async fn clear(&self) -> eyre::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
