//! Balance reads over the chains' JSON-RPC endpoints.

use crate::{
    accounts::RETRY_LAYER, config::SendConfig, execution::ArrivalProbe, types::IERC20,
};
use alloy::{
    primitives::{Address, ChainId, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::ClientBuilder,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use url::Url;

/// Balances of the user's smart account on one chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBalance {
    /// Native balance in wei.
    pub native: U256,
    /// Balance of the configured token, if the chain has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<U256>,
}

/// Balances of the user's smart accounts across chains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalances {
    /// Balances per chain.
    pub chains: BTreeMap<ChainId, ChainBalance>,
}

impl WalletBalances {
    /// Sum of the token balances over all chains.
    pub fn token_total(&self) -> U256 {
        self.chains.values().filter_map(|balance| balance.token).fold(U256::ZERO, |a, b| a + b)
    }
}

/// Connects a provider to `url` with the client retry policy.
pub fn connect(url: Url) -> DynProvider {
    let client = ClientBuilder::default().layer(RETRY_LAYER.clone()).http(url);
    ProviderBuilder::new().connect_client(client).erased()
}

#[derive(Debug, Clone)]
struct ChainReader {
    provider: DynProvider,
    account: Address,
    token: Option<Address>,
}

/// Reads smart account balances on every chain with a configured endpoint.
#[derive(Debug, Clone, Default)]
pub struct BalanceReader {
    chains: BTreeMap<ChainId, ChainReader>,
}

impl BalanceReader {
    /// Connects to every chain in `config` that has an RPC endpoint.
    pub fn from_config(config: &SendConfig) -> Self {
        let chains = config
            .chains
            .iter()
            .filter_map(|(&chain_id, chain)| {
                let provider = connect(chain.endpoint.clone()?);
                Some((chain_id, ChainReader { provider, account: chain.account, token: chain.token }))
            })
            .collect();
        Self { chains }
    }

    /// Provider of `chain_id`, if the chain has an endpoint.
    pub fn provider(&self, chain_id: ChainId) -> Option<&DynProvider> {
        self.chains.get(&chain_id).map(|reader| &reader.provider)
    }

    /// Whether no chain can be read.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Reads native and token balances on every readable chain concurrently.
    #[instrument(skip(self))]
    pub async fn read(&self) -> eyre::Result<WalletBalances> {
        let chains = futures_util::future::try_join_all(self.chains.iter().map(
            |(&chain_id, reader)| async move {
                let native = reader.provider.get_balance(reader.account).await?;
                let token = match reader.token {
                    Some(token) => Some(
                        IERC20::new(token, &reader.provider).balanceOf(reader.account).call().await?,
                    ),
                    None => None,
                };
                debug!(chain_id, %native, ?token, "Read balances");
                eyre::Ok((chain_id, ChainBalance { native, token }))
            },
        ))
        .await?;

        Ok(WalletBalances { chains: chains.into_iter().collect() })
    }
}

/// Reports arrival once `holder` owns at least `target` of `token`.
///
/// Used after the bridge send: the destination account holding the amount to deliver is exactly
/// what the deliver step needs.
#[derive(Debug, Clone)]
pub struct BalanceProbe {
    provider: DynProvider,
    token: Address,
    holder: Address,
    target: U256,
}

impl BalanceProbe {
    /// Creates a new probe.
    pub fn new(provider: DynProvider, token: Address, holder: Address, target: U256) -> Self {
        Self { provider, token, holder, target }
    }
}

#[async_trait]
impl ArrivalProbe for BalanceProbe {
    async fn has_arrived(&self) -> eyre::Result<bool> {
        let balance = IERC20::new(self.token, &self.provider).balanceOf(self.holder).call().await?;
        debug!(holder = %self.holder, %balance, target = %self.target, "Probed balance");
        Ok(balance >= self.target)
    }
}
