//! Smart account handles per chain.
//!
//! Every supported chain has exactly one [`SmartAccount`]: the user's account address plus the
//! bundler and sponsor serving that chain. Handles are built once from configuration and shared
//! by all transfers.

mod bundler;
pub use bundler::{Bundler, BundlerClient};

mod paymaster;
pub use paymaster::{PaymasterClient, Sponsor, SponsorshipContext};

use crate::{
    config::{GasConfig, SendConfig},
    error::AccountResolutionError,
};
use alloy::{
    primitives::{Address, ChainId},
    rpc::client::ClientBuilder,
    transports::layers::RetryBackoffLayer,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{fmt, sync::Arc};
use tracing::debug;

/// Retry policy for bundler and paymaster clients.
///
/// We are allowing max 10 retries with a backoff of 800ms. The CU/s is set to max value to avoid
/// any throttling.
pub(crate) const RETRY_LAYER: RetryBackoffLayer = RetryBackoffLayer::new(10, 800, u64::MAX);

/// A ready to use smart account on one chain.
#[derive(Clone)]
pub struct SmartAccount {
    /// The chain ID.
    pub chain_id: ChainId,
    /// The account address.
    pub address: Address,
    /// Entrypoint the account is bound to.
    pub entrypoint: Address,
    /// Gas defaults for new operations.
    pub gas: GasConfig,
    /// Fee sponsor for this chain.
    pub sponsor: Arc<dyn Sponsor>,
    /// Bundler for this chain.
    pub bundler: Arc<dyn Bundler>,
}

impl fmt::Debug for SmartAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartAccount")
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .field("entrypoint", &self.entrypoint)
            .finish_non_exhaustive()
    }
}

/// Resolves the smart account for a chain.
#[async_trait]
pub trait AccountResolver: fmt::Debug + Send + Sync {
    /// Returns the account handle for `chain_id`.
    async fn resolve(&self, chain_id: ChainId) -> Result<SmartAccount, AccountResolutionError>;
}

/// Account handles built from configuration.
#[derive(Debug, Default)]
pub struct Accounts {
    accounts: DashMap<ChainId, SmartAccount>,
}

impl Accounts {
    /// Creates a resolver over the given accounts.
    pub fn new(accounts: impl IntoIterator<Item = SmartAccount>) -> Self {
        Self { accounts: accounts.into_iter().map(|account| (account.chain_id, account)).collect() }
    }

    /// Builds bundler and paymaster clients for every configured chain.
    pub fn from_config(config: &SendConfig) -> Self {
        Self::new(config.chains.iter().map(|(&chain_id, chain)| {
            let bundler =
                ClientBuilder::default().layer(RETRY_LAYER.clone()).http(chain.bundler.clone());
            let paymaster =
                ClientBuilder::default().layer(RETRY_LAYER.clone()).http(chain.paymaster.clone());

            debug!(chain_id, name = %chain.name, account = %chain.account, "Configured smart account");

            SmartAccount {
                chain_id,
                address: chain.account,
                entrypoint: chain.entrypoint,
                gas: chain.gas,
                sponsor: Arc::new(PaymasterClient::new(
                    chain_id,
                    paymaster,
                    SponsorshipContext::default(),
                )),
                bundler: Arc::new(BundlerClient::new(chain_id, bundler)),
            }
        }))
    }
}

#[async_trait]
impl AccountResolver for Accounts {
    async fn resolve(&self, chain_id: ChainId) -> Result<SmartAccount, AccountResolutionError> {
        self.accounts
            .get(&chain_id)
            .map(|account| account.value().clone())
            .ok_or(AccountResolutionError::UnsupportedChain(chain_id))
    }
}
