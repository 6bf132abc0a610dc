//! Transfer configuration.
use crate::{
    constants::{
        DEFAULT_CALL_GAS_LIMIT, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_ENTRYPOINT,
        DEFAULT_MAX_FEE_PER_GAS, DEFAULT_MAX_PRIORITY_FEE_PER_GAS, DEFAULT_MULTICHAIN_MODULE,
        DEFAULT_PRE_VERIFICATION_GAS, DEFAULT_RECEIPT_POLL_INTERVAL, DEFAULT_SETTLING_DELAY,
        DEFAULT_SUBMISSION_ATTEMPTS, DEFAULT_VERIFICATION_GAS_LIMIT,
    },
    execution::SettlingPolicy,
};
use alloy::primitives::{Address, ChainId, U256};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};
use url::Url;

/// Transfer configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendConfig {
    /// Chain configurations, keyed by chain id.
    #[serde(default)]
    pub chains: BTreeMap<ChainId, ChainConfig>,
    /// The fixed transfer route.
    pub route: RouteConfig,
    /// Execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Batch signing configuration.
    #[serde(default)]
    pub signing: SigningConfig,
    /// Record-keeping service configuration.
    #[serde(default)]
    pub records: RecordsConfig,
    /// Local session cache configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Transfer journal configuration.
    #[serde(default)]
    pub journal: JournalConfig,
}

impl SendConfig {
    /// Adds or replaces a chain.
    pub fn with_chain(mut self, chain_id: ChainId, chain: ChainConfig) -> Self {
        self.chains.insert(chain_id, chain);
        self
    }

    /// Sets the route.
    pub fn with_route(mut self, route: RouteConfig) -> Self {
        self.route = route;
        self
    }

    /// Sets the settling delay between the bridge send and the destination transfer.
    pub fn with_settling_delay(mut self, delay: Duration) -> Self {
        self.route.settling_delay = delay;
        self
    }

    /// Sets the confirmation timeout.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.execution.confirmation_timeout = timeout;
        self
    }

    /// Sets the record-keeping service base URL.
    pub fn with_records_url(mut self, base_url: Url) -> Self {
        self.records.base_url = base_url;
        self
    }

    /// Sets the session cache path.
    pub fn with_session_path(mut self, path: PathBuf) -> Self {
        self.session.path = path;
        self
    }

    /// Sets the journal directory.
    pub fn with_journal_dir(mut self, dir: PathBuf) -> Self {
        self.journal.dir = dir;
        self
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks that the route only references configured chains.
    pub fn validate(&self) -> eyre::Result<()> {
        for (role, chain_id) in
            [("source", self.route.source_chain), ("destination", self.route.destination_chain)]
        {
            if !self.chains.contains_key(&chain_id) {
                eyre::bail!("{role} chain {chain_id} is not configured");
            }
        }
        if self.route.source_chain == self.route.destination_chain {
            eyre::bail!("source and destination chain are both {}", self.route.source_chain);
        }
        Ok(())
    }
}

/// Per chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human readable chain name, used in logs.
    #[serde(default)]
    pub name: String,
    /// Bundler JSON-RPC endpoint.
    pub bundler: Url,
    /// Paymaster JSON-RPC endpoint.
    pub paymaster: Url,
    /// Chain JSON-RPC endpoint, used for balance reads and arrival probes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
    /// The user's smart account on this chain.
    pub account: Address,
    /// The entrypoint the account uses.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: Address,
    /// The transferred token on this chain, if any. Used for balance reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Address>,
    /// Gas defaults for operations on this chain.
    #[serde(default)]
    pub gas: GasConfig,
}

fn default_entrypoint() -> Address {
    DEFAULT_ENTRYPOINT
}

/// Gas limits and fee caps used when building operations.
///
/// Limits may be overridden by the sponsor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasConfig {
    /// Gas for the inner call.
    pub call_gas_limit: U256,
    /// Gas for validation.
    pub verification_gas_limit: U256,
    /// Bundler overhead.
    pub pre_verification_gas: U256,
    /// EIP-1559 max fee per gas.
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas.
    pub max_priority_fee_per_gas: U256,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            call_gas_limit: DEFAULT_CALL_GAS_LIMIT,
            verification_gas_limit: DEFAULT_VERIFICATION_GAS_LIMIT,
            pre_verification_gas: DEFAULT_PRE_VERIFICATION_GAS,
            max_fee_per_gas: DEFAULT_MAX_FEE_PER_GAS,
            max_priority_fee_per_gas: DEFAULT_MAX_PRIORITY_FEE_PER_GAS,
        }
    }
}

/// The transfer route: token and bridge on the source chain, token on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Chain the tokens leave from.
    pub source_chain: ChainId,
    /// Chain the receiver is paid on.
    pub destination_chain: ChainId,
    /// Token approved and bridged on the source chain.
    pub source_token: Address,
    /// Bridge contract on the source chain.
    pub bridge: Address,
    /// Token transferred to the receiver on the destination chain.
    pub destination_token: Address,
    /// Destination chain name as understood by the bridge.
    pub bridge_destination: String,
    /// Token symbol as understood by the bridge.
    pub token_symbol: String,
    /// Token decimals, used to parse and display amounts.
    #[serde(default = "default_decimals")]
    pub token_decimals: u8,
    /// Minimum wait after the bridge send before delivering.
    #[serde(with = "crate::serde::duration", default = "default_settling_delay")]
    pub settling_delay: Duration,
    /// Skip delivery when the bridge send did not confirm.
    #[serde(default = "default_true")]
    pub deliver_requires_bridge: bool,
    /// Reject requests whose source and destination amounts differ.
    #[serde(default)]
    pub require_equal_amounts: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            source_chain: 0,
            destination_chain: 0,
            source_token: Address::ZERO,
            bridge: Address::ZERO,
            destination_token: Address::ZERO,
            bridge_destination: String::new(),
            token_symbol: String::new(),
            token_decimals: default_decimals(),
            settling_delay: DEFAULT_SETTLING_DELAY,
            deliver_requires_bridge: true,
            require_equal_amounts: false,
        }
    }
}

fn default_decimals() -> u8 {
    6
}

fn default_settling_delay() -> Duration {
    DEFAULT_SETTLING_DELAY
}

fn default_true() -> bool {
    true
}

/// Execution sequencer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// How long to wait for a receipt.
    #[serde(with = "crate::serde::duration")]
    pub confirmation_timeout: Duration,
    /// Receipt polling interval.
    #[serde(with = "crate::serde::duration")]
    pub poll_interval: Duration,
    /// Submission attempts on transport failures.
    pub max_submission_attempts: u32,
    /// What to do after the settling delay of a step.
    #[serde(default)]
    pub settling: SettlingPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            max_submission_attempts: DEFAULT_SUBMISSION_ATTEMPTS,
            settling: SettlingPolicy::default(),
        }
    }
}

/// Batch signing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Validation module checking the multichain signature.
    pub validation_module: Address,
    /// How long signatures stay valid. Zero means no expiry.
    #[serde(with = "crate::serde::duration", default)]
    pub validity: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self { validation_module: DEFAULT_MULTICHAIN_MODULE, validity: Duration::ZERO }
    }
}

/// Record-keeping service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Base URL; `api/save-transactions` and `api/fetch-transactions` are resolved against it.
    pub base_url: Url,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self { base_url: Url::parse("http://localhost:3000/").expect("valid url") }
    }
}

/// Local session cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of the session file.
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { path: PathBuf::from(".xsend/session.json") }
    }
}

/// Transfer journal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Directory holding one journal file per transfer. Resuming a transfer from another process
    /// needs the same directory.
    pub dir: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(".xsend/journal") }
    }
}
