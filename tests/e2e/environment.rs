//! Test environment: mock services and a wired orchestrator.

use alloy::{
    primitives::{Address, B256, ChainId, U256, address, bytes, keccak256},
    sol_types::SolCall,
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use xsend::{
    accounts::{AccountResolver, Accounts, Bundler, SmartAccount, Sponsor},
    config::{ExecutionConfig, GasConfig, RouteConfig},
    constants::{DEFAULT_ENTRYPOINT, DEFAULT_MULTICHAIN_MODULE},
    error::{BundlerError, RecordError, SponsorshipError},
    events::{ProgressEvent, ProgressNotifier},
    execution::ExecutionSequencer,
    orchestrator::TransferOrchestrator,
    records::RecordKeeper,
    signers::{DynSigner, MultiChainSigner, PayloadSigner},
    storage::TransferStorage,
    types::{
        ISmartAccount, InclusionReceipt, SponsorshipData, TransferRecord, TransferRequest,
        UserOpReceipt, UserOperation,
    },
};

pub const SOURCE_CHAIN: ChainId = 43113;
pub const DESTINATION_CHAIN: ChainId = 11155111;

pub const SOURCE_ACCOUNT: Address = address!("0x00000000000000000000000000000000000a0001");
pub const DESTINATION_ACCOUNT: Address = address!("0x00000000000000000000000000000000000a0002");

pub const SOURCE_TOKEN: Address = address!("0x57F1c63497AEe0bE305B8852b354CEc793da43bB");
pub const BRIDGE: Address = address!("0xC249632c2D40b9001FE907806902f63038B737Ab");
pub const DESTINATION_TOKEN: Address = address!("0x254d06f33bDc5b8ee05b2ea472107E300226659A");

pub const RECEIVER: Address = address!("0x000000000000000000000000000000000000beef");

/// One token with 6 decimals.
pub const ONE: u64 = 1_000_000;

/// What a bundler does with operations calling a given target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Included and successful.
    Confirm,
    /// Included, inner call reverted.
    Revert,
    /// Accepted, never included.
    Never,
    /// Rejected at submission.
    Reject,
}

/// Extracts the contract an account operation calls.
pub fn target_of(op: &UserOperation) -> Address {
    ISmartAccount::executeCall::abi_decode(&op.callData)
        .map(|call| call.dest)
        .unwrap_or(Address::ZERO)
}

#[derive(Debug, Default)]
struct BundlerState {
    behaviors: BTreeMap<Address, Behavior>,
    submitted: Vec<Address>,
    pending: BTreeMap<B256, (Address, Address)>,
}

/// Bundler whose behavior is scripted per called contract.
#[derive(Debug)]
pub struct MockBundler {
    chain_id: ChainId,
    state: Mutex<BundlerState>,
}

impl MockBundler {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id, state: Mutex::default() }
    }

    /// Scripts operations calling `target`. Unscripted targets confirm.
    pub fn script(&self, target: Address, behavior: Behavior) {
        self.state.lock().unwrap().behaviors.insert(target, behavior);
    }

    /// Targets of every accepted submission, in submission order.
    pub fn submitted(&self) -> Vec<Address> {
        self.state.lock().unwrap().submitted.clone()
    }

    fn behavior(state: &BundlerState, target: Address) -> Behavior {
        state.behaviors.get(&target).copied().unwrap_or(Behavior::Confirm)
    }
}

#[async_trait]
impl Bundler for MockBundler {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entrypoint: Address,
    ) -> Result<B256, BundlerError> {
        let target = target_of(op);
        let mut state = self.state.lock().unwrap();
        if Self::behavior(&state, target) == Behavior::Reject {
            return Err(BundlerError::Rejected("AA23 reverted".to_string()));
        }
        let hash = op.hash(entrypoint, self.chain_id);
        state.submitted.push(target);
        state.pending.insert(hash, (target, op.sender));
        Ok(hash)
    }

    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOpReceipt>, BundlerError> {
        let state = self.state.lock().unwrap();
        let Some(&(target, sender)) = state.pending.get(&user_op_hash) else {
            return Ok(None);
        };
        let receipt = |success: bool, reason: Option<&str>| UserOpReceipt {
            user_op_hash,
            sender,
            success,
            actual_gas_cost: U256::from(21_000u64),
            actual_gas_used: U256::from(21_000u64),
            reason: reason.map(str::to_string),
            receipt: InclusionReceipt { transaction_hash: keccak256(user_op_hash), block_number: 1 },
        };
        Ok(match Self::behavior(&state, target) {
            Behavior::Confirm => Some(receipt(true, None)),
            Behavior::Revert => Some(receipt(false, Some("ERC20: insufficient allowance"))),
            Behavior::Never | Behavior::Reject => None,
        })
    }
}

/// Sponsor that covers every operation except those calling declined targets.
#[derive(Debug)]
pub struct MockSponsor {
    chain_id: ChainId,
    declined: Mutex<HashSet<Address>>,
    calls: AtomicUsize,
}

impl MockSponsor {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id, declined: Mutex::default(), calls: AtomicUsize::new(0) }
    }

    /// Declines operations calling `target`.
    pub fn decline(&self, target: Address) {
        self.declined.lock().unwrap().insert(target);
    }

    /// Number of sponsorship requests.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sponsor for MockSponsor {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn sponsor(&self, op: &UserOperation) -> Result<SponsorshipData, SponsorshipError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.declined.lock().unwrap().contains(&target_of(op)) {
            return Err(SponsorshipError::Declined {
                chain_id: self.chain_id,
                reason: "policy does not cover this contract".to_string(),
            });
        }
        Ok(SponsorshipData {
            paymaster_and_data: bytes!("0x00000f79b7faf42eebadba19acc07cd08af44789"),
            call_gas_limit: None,
            verification_gas_limit: None,
            pre_verification_gas: None,
        })
    }
}

/// In-memory record-keeping service.
#[derive(Debug, Default)]
pub struct MockRecordKeeper {
    records: Mutex<Vec<TransferRecord>>,
    fail_saves: AtomicBool,
    fail_history: AtomicBool,
    saves: AtomicUsize,
}

impl MockRecordKeeper {
    /// Makes every save fail with a 500.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Makes every history fetch fail with a 503.
    pub fn fail_history(&self) {
        self.fail_history.store(true, Ordering::SeqCst);
    }

    /// Records accepted so far.
    pub fn records(&self) -> Vec<TransferRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of save attempts, successful or not.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordKeeper for MockRecordKeeper {
    async fn save(&self, record: &TransferRecord) -> Result<(), RecordError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RecordError::Status { status: 500, body: "database unavailable".into() });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn history(&self, wallet: Address) -> Result<Vec<TransferRecord>, RecordError> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(RecordError::Status { status: 503, body: String::new() });
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.wallet_address == wallet)
            .cloned()
            .collect())
    }
}

/// Owner signer counting signature requests.
#[derive(Debug)]
pub struct CountingSigner {
    inner: DynSigner,
    calls: AtomicUsize,
    reject: AtomicBool,
}

impl CountingSigner {
    pub fn random() -> Self {
        Self {
            inner: DynSigner::random(),
            calls: AtomicUsize::new(0),
            reject: AtomicBool::new(false),
        }
    }

    /// Declines every later signature request, like a user closing the wallet prompt.
    pub fn reject(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    /// Number of signature requests.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayloadSigner for CountingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_payload_hash(&self, payload_hash: B256) -> eyre::Result<alloy::primitives::Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            eyre::bail!("user declined the signature request");
        }
        self.inner.sign_payload_hash(payload_hash).await
    }
}

/// The route every test transfers along.
pub fn route() -> RouteConfig {
    RouteConfig {
        source_chain: SOURCE_CHAIN,
        destination_chain: DESTINATION_CHAIN,
        source_token: SOURCE_TOKEN,
        bridge: BRIDGE,
        destination_token: DESTINATION_TOKEN,
        bridge_destination: "ethereum-sepolia".to_string(),
        token_symbol: "aUSDC".to_string(),
        token_decimals: 6,
        settling_delay: Duration::from_secs(120),
        deliver_requires_bridge: true,
        require_equal_amounts: false,
    }
}

/// A request for `source` tokens out and `destination` tokens delivered.
pub fn request(source: u64, destination: u64) -> TransferRequest {
    TransferRequest::new(RECEIVER, U256::from(source * ONE), U256::from(destination * ONE))
}

/// An orchestrator wired to mock services on both chains of [`route`].
pub struct Environment {
    pub orchestrator: TransferOrchestrator,
    pub source_bundler: Arc<MockBundler>,
    pub destination_bundler: Arc<MockBundler>,
    pub source_sponsor: Arc<MockSponsor>,
    pub destination_sponsor: Arc<MockSponsor>,
    pub records: Arc<MockRecordKeeper>,
    pub signer: Arc<CountingSigner>,
    pub storage: TransferStorage,
}

impl Environment {
    /// Default route with an in-memory journal.
    pub fn setup() -> Self {
        Self::with(route(), TransferStorage::in_memory())
    }

    /// Custom route and journal.
    pub fn with(route: RouteConfig, storage: TransferStorage) -> Self {
        let source_bundler = Arc::new(MockBundler::new(SOURCE_CHAIN));
        let destination_bundler = Arc::new(MockBundler::new(DESTINATION_CHAIN));
        let source_sponsor = Arc::new(MockSponsor::new(SOURCE_CHAIN));
        let destination_sponsor = Arc::new(MockSponsor::new(DESTINATION_CHAIN));

        let accounts: Arc<dyn AccountResolver> = Arc::new(Accounts::new([
            SmartAccount {
                chain_id: SOURCE_CHAIN,
                address: SOURCE_ACCOUNT,
                entrypoint: DEFAULT_ENTRYPOINT,
                gas: GasConfig::default(),
                sponsor: source_sponsor.clone(),
                bundler: source_bundler.clone(),
            },
            SmartAccount {
                chain_id: DESTINATION_CHAIN,
                address: DESTINATION_ACCOUNT,
                entrypoint: DEFAULT_ENTRYPOINT,
                gas: GasConfig::default(),
                sponsor: destination_sponsor.clone(),
                bundler: destination_bundler.clone(),
            },
        ]));

        let records = Arc::new(MockRecordKeeper::default());
        let signer = Arc::new(CountingSigner::random());
        let events = ProgressNotifier::default();

        let sequencer = ExecutionSequencer::new(
            accounts.clone(),
            storage.clone(),
            events.clone(),
            ExecutionConfig::default(),
        );
        let orchestrator = TransferOrchestrator::new(
            route,
            accounts,
            MultiChainSigner::new(signer.clone(), DEFAULT_MULTICHAIN_MODULE, Duration::ZERO),
            sequencer,
            storage.clone(),
            records.clone(),
            events,
        );

        Self {
            orchestrator,
            source_bundler,
            destination_bundler,
            source_sponsor,
            destination_sponsor,
            records,
            signer,
            storage,
        }
    }

    /// Owner of the smart accounts.
    /// Every accepted submission on either chain.
    pub fn submissions(&self) -> usize {
        self.source_bundler.submitted().len() + self.destination_bundler.submitted().len()
    }
}

/// Drains the events published so far.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
