//! Transfer constants.

use alloy::primitives::{Address, U256, address};
use std::time::Duration;

/// The ERC-4337 v0.6 entrypoint, deployed at the same address on every supported chain.
pub const DEFAULT_ENTRYPOINT: Address = address!("0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// Biconomy multichain validation module (v2 accounts).
pub const DEFAULT_MULTICHAIN_MODULE: Address =
    address!("0x000000824dc138db84FD9109fc154bdad332Aa8E");

/// How long to wait between a bridge send and the destination transfer.
///
/// This is the time the bridge usually needs to credit the destination chain.
pub const DEFAULT_SETTLING_DELAY: Duration = Duration::from_secs(120);

/// How long to wait for a user operation receipt before declaring the step failed.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Interval between `eth_getUserOperationReceipt` polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Submission attempts for transport level bundler failures.
pub const DEFAULT_SUBMISSION_ATTEMPTS: u32 = 3;

/// Pause between submission attempts.
pub const SUBMISSION_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Paymaster sponsorship mode requesting that the sponsor pays all fees.
pub const SPONSORED_MODE: &str = "SPONSORED";

/// Smart account implementation name reported to the paymaster.
pub const SMART_ACCOUNT_NAME: &str = "BICONOMY";

/// Smart account implementation version reported to the paymaster.
pub const SMART_ACCOUNT_VERSION: &str = "2.0.0";

/// Default call gas limit when the sponsor does not compute one.
pub const DEFAULT_CALL_GAS_LIMIT: U256 = U256::from_limbs([200_000, 0, 0, 0]);

/// Default verification gas limit when the sponsor does not compute one.
pub const DEFAULT_VERIFICATION_GAS_LIMIT: U256 = U256::from_limbs([150_000, 0, 0, 0]);

/// Default pre-verification gas when the sponsor does not compute one.
pub const DEFAULT_PRE_VERIFICATION_GAS: U256 = U256::from_limbs([60_000, 0, 0, 0]);

/// Default max fee per gas, 30 gwei.
pub const DEFAULT_MAX_FEE_PER_GAS: U256 = U256::from_limbs([30_000_000_000, 0, 0, 0]);

/// Default max priority fee per gas, 1.5 gwei.
pub const DEFAULT_MAX_PRIORITY_FEE_PER_GAS: U256 = U256::from_limbs([1_500_000_000, 0, 0, 0]);

/// Capacity of the progress notification channel.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Version of the local session cache format.
pub const SESSION_VERSION: u32 = 1;
