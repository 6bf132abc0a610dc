//! Transfer orchestration.
//!
//! A transfer moves `amount_from_source` of the route's source token through the bridge and pays
//! `amount_to_destination` of the destination token to the receiver:
//!
//! 1. approve: `source_token.approve(bridge, amount_from_source)` on the source chain
//! 2. send-to-bridge: `bridge.send(destination, symbol, amount_from_source)` on the source chain
//! 3. deliver: `destination_token.transfer(receiver, amount_to_destination)` on the destination
//!    chain
//!
//! All three are built and sponsored up front and signed as one batch, so the owner signs once.
//! Nothing is submitted before the whole batch is signed.

use crate::{
    accounts::AccountResolver,
    balances::{BalanceProbe, BalanceReader},
    builder::OperationBuilder,
    config::RouteConfig,
    error::{SkipReason, StorageError, TransferError},
    events::{ProgressEvent, ProgressNotifier, Stage},
    execution::{ArrivalProbe, ExecutionSequencer, ExecutionStep, StepKind, StepOutcome},
    records::RecordKeeper,
    signers::MultiChainSigner,
    sponsorship::SponsorshipResolver,
    storage::{StorageApi, TransferJournal, TransferStorage},
    types::{
        DeliveryStatus, IBridgeSender, IERC20, SignedOperation, TransferId, TransferRecord,
        TransferRequest,
    },
};
use alloy::{primitives::Address, sol_types::SolCall};
use dashmap::DashMap;
use metrics::Counter;
use metrics_derive::Metrics;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Metrics for the [`TransferOrchestrator`].
#[derive(Metrics)]
#[metrics(scope = "transfers")]
pub struct TransferMetrics {
    /// Number of transfers started.
    pub started: Counter,
    /// Number of transfers whose plan ran to completion.
    pub completed: Counter,
    /// Number of transfers that stopped before submitting anything.
    pub aborted: Counter,
    /// Number of transfers aborted because a sponsor declined.
    pub sponsorship_declined: Counter,
    /// Number of records that could not be persisted.
    pub record_failures: Counter,
}

/// A non-fatal problem encountered after execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TransferWarning {
    /// The record-keeping service did not accept the record.
    #[error("transfer record not persisted: {0}")]
    RecordPersistenceFailure(String),
    /// The history could not be fetched.
    #[error("transfer history unavailable: {0}")]
    HistoryUnavailable(String),
    /// The deliver step never ran, so there is nothing to record.
    #[error("delivery skipped, nothing recorded: {0}")]
    DeliverySkipped(SkipReason),
    /// The record was persisted but the journal could not be updated.
    #[error("record persisted but not journaled: {0}")]
    JournalOutdated(String),
}

/// Outcome of one step of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// What the step did.
    pub kind: StepKind,
    /// Position in the plan.
    pub order: u32,
    /// Final outcome.
    pub outcome: StepOutcome,
}

/// Result of [`TransferOrchestrator::send`].
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    /// The transfer.
    pub id: TransferId,
    /// One report per step, by order.
    pub steps: Vec<StepReport>,
    /// The record persisted by this invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<TransferRecord>,
    /// History of the sending smart account after recording.
    pub history: Vec<TransferRecord>,
    /// Problems that did not fail the transfer.
    pub warnings: Vec<TransferWarning>,
}

impl TransferReport {
    /// Report of the step of `kind`.
    pub fn step(&self, kind: StepKind) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.kind == kind)
    }

    /// Number of confirmed steps.
    pub fn confirmed(&self) -> usize {
        self.steps.iter().filter(|step| step.outcome.is_confirmed()).count()
    }

    /// Number of failed steps.
    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|step| step.outcome.is_failed()).count()
    }

    /// Number of skipped steps.
    pub fn skipped(&self) -> usize {
        self.steps.iter().filter(|step| step.outcome.is_skipped()).count()
    }

    /// Whether every step confirmed.
    pub fn is_success(&self) -> bool {
        self.confirmed() == self.steps.len()
    }
}

/// Runs transfers along one route.
#[derive(Debug)]
pub struct TransferOrchestrator {
    route: RouteConfig,
    builder: OperationBuilder,
    sponsorship: SponsorshipResolver,
    signer: MultiChainSigner,
    sequencer: ExecutionSequencer,
    storage: TransferStorage,
    records: Arc<dyn RecordKeeper>,
    balances: BalanceReader,
    events: ProgressNotifier,
    /// One lock per transfer id being run, so the same transfer never runs twice at once.
    running: DashMap<TransferId, Arc<Mutex<()>>>,
    metrics: TransferMetrics,
}

impl TransferOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        route: RouteConfig,
        accounts: Arc<dyn AccountResolver>,
        signer: MultiChainSigner,
        sequencer: ExecutionSequencer,
        storage: TransferStorage,
        records: Arc<dyn RecordKeeper>,
        events: ProgressNotifier,
    ) -> Self {
        Self {
            route,
            builder: OperationBuilder::new(accounts.clone()),
            sponsorship: SponsorshipResolver::new(accounts),
            signer,
            sequencer,
            storage,
            records,
            balances: BalanceReader::default(),
            events,
            running: DashMap::new(),
            metrics: TransferMetrics::default(),
        }
    }

    /// Sets the balance reader used for arrival probes on the destination chain.
    pub fn with_balances(mut self, balances: BalanceReader) -> Self {
        self.balances = balances;
        self
    }

    /// The route transfers follow.
    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    /// Subscribes to progress events of all transfers.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Runs a transfer to completion. See [`Self::send_with_cancel`].
    pub async fn send(&self, request: TransferRequest) -> Result<TransferReport, TransferError> {
        self.send_with_cancel(request, CancellationToken::new()).await
    }

    /// Resumes a journaled transfer to completion. See [`Self::resume_with_cancel`].
    pub async fn resume(&self, id: TransferId) -> Result<TransferReport, TransferError> {
        self.resume_with_cancel(id, CancellationToken::new()).await
    }

    /// Resumes the journaled transfer `id`.
    ///
    /// Unlike [`Self::send_with_cancel`], this never prepares a new plan: a transfer without a
    /// journal fails with [`StorageError::UnknownTransfer`].
    pub async fn resume_with_cancel(
        &self,
        id: TransferId,
        cancel: CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        let journal = self.journal(id).await?;
        self.send_with_cancel(journal.request, cancel).await
    }

    /// Reads the journal of transfer `id`.
    pub async fn journal(&self, id: TransferId) -> Result<TransferJournal, TransferError> {
        self.storage
            .read_journal(id)
            .await?
            .ok_or(TransferError::Storage(StorageError::UnknownTransfer(id)))
    }

    /// Runs a transfer.
    ///
    /// Errors are only returned when nothing was submitted. Once execution starts, step failures
    /// are reported per step and record-keeping problems as warnings. Sending a request with the
    /// id of an earlier transfer resumes that transfer from its journal. Concurrent calls for the
    /// same id run one after another.
    #[instrument(skip_all, fields(transfer_id = %request.id, receiver = %request.receiver))]
    pub async fn send_with_cancel(
        &self,
        request: TransferRequest,
        cancel: CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        self.metrics.started.increment(1);

        let result = {
            let lock = self.running.entry(request.id).or_default().clone();
            let _running = lock.lock().await;
            self.run(request.clone(), &cancel).await
        };
        self.running.remove_if(&request.id, |_, lock| Arc::strong_count(lock) == 1);

        match result {
            Ok(report) => {
                self.metrics.completed.increment(1);
                info!(
                    confirmed = report.confirmed(),
                    failed = report.failed(),
                    skipped = report.skipped(),
                    warnings = report.warnings.len(),
                    "Transfer finished"
                );
                self.events.notify(
                    request.id,
                    Stage::Completed,
                    format!("{}/{} steps confirmed", report.confirmed(), report.steps.len()),
                );
                Ok(report)
            }
            Err(err) => {
                self.metrics.aborted.increment(1);
                if matches!(err, TransferError::SponsorshipDeclined(ref err) if err.is_declined()) {
                    self.metrics.sponsorship_declined.increment(1);
                }
                warn!(%err, "Transfer aborted");
                self.events.notify(request.id, Stage::Aborted, err.to_string());
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request: TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        self.validate(&request)?;

        let (request, steps, recorded) = match self.storage.read_journal(request.id).await? {
            Some(journal) => {
                if journal.request != request {
                    warn!("Request differs from the journaled one, resuming the journaled request");
                }
                info!(recorded = journal.recorded, "Resuming transfer from journal");
                (journal.request, journal.steps, journal.recorded)
            }
            None => {
                let steps = self.prepare(&request, cancel).await?;
                self.storage.write_journal(&TransferJournal::new(request.clone(), steps.clone())).await?;
                (request, steps, false)
            }
        };
        let steps = self.attach_probe(steps, &request);
        let wallet = steps
            .iter()
            .find(|step| step.kind == StepKind::Deliver)
            .map(|step| step.op.sender())
            .ok_or_else(|| eyre::eyre!("plan has no deliver step"))?;

        let outcomes = self.sequencer.execute(request.id, &steps, cancel).await?;
        let steps: Vec<_> = steps
            .iter()
            .zip(outcomes)
            .map(|(step, outcome)| StepReport { kind: step.kind, order: step.order, outcome })
            .collect();

        let mut report =
            TransferReport { id: request.id, steps, record: None, history: vec![], warnings: vec![] };
        self.record(&request, wallet, recorded, &mut report).await;
        Ok(report)
    }

    fn validate(&self, request: &TransferRequest) -> Result<(), TransferError> {
        if request.amount_from_source.is_zero() || request.amount_to_destination.is_zero() {
            return Err(TransferError::InvalidAmount);
        }
        if self.route.require_equal_amounts
            && request.amount_from_source != request.amount_to_destination
        {
            return Err(TransferError::AmountMismatch {
                source_amount: request.amount_from_source,
                destination_amount: request.amount_to_destination,
            });
        }
        Ok(())
    }

    /// Builds, sponsors and signs the three operations of a transfer.
    async fn prepare(
        &self,
        request: &TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExecutionStep>, TransferError> {
        let route = &self.route;
        let ensure_live = || {
            if cancel.is_cancelled() { Err(TransferError::Cancelled(request.id)) } else { Ok(()) }
        };

        ensure_live()?;
        self.events.notify(request.id, Stage::Preparing, "building operations");

        let approve = IERC20::approveCall { spender: route.bridge, amount: request.amount_from_source };
        let send = IBridgeSender::sendCall {
            destinationChain: route.bridge_destination.clone(),
            tokenSymbol: route.token_symbol.clone(),
            amount: request.amount_from_source,
        };
        let deliver =
            IERC20::transferCall { to: request.receiver, amount: request.amount_to_destination };

        let (approve, send, deliver) = tokio::try_join!(
            self.builder.build(route.source_chain, route.source_token, approve.abi_encode().into()),
            self.builder.build(route.source_chain, route.bridge, send.abi_encode().into()),
            self.builder.build(
                route.destination_chain,
                route.destination_token,
                deliver.abi_encode().into()
            ),
        )?;

        ensure_live()?;
        let (approve, send, deliver) = tokio::try_join!(
            self.sponsorship.sponsor(approve),
            self.sponsorship.sponsor(send),
            self.sponsorship.sponsor(deliver),
        )?;

        ensure_live()?;
        self.events.notify(request.id, Stage::Signing, "waiting for the owner to sign the batch");
        let signed = self
            .signer
            .sign_batch(vec![
                (approve, route.source_chain),
                (send, route.source_chain),
                (deliver, route.destination_chain),
            ])
            .await?;
        let [approve, send, deliver]: [SignedOperation; 3] = signed
            .try_into()
            .map_err(|_| eyre::eyre!("signer returned a batch of unexpected size"))?;

        ensure_live()?;
        Ok(self.plan(approve, send, deliver))
    }

    /// Orders the signed operations: approve, then send-to-bridge, then deliver.
    fn plan(
        &self,
        approve: SignedOperation,
        send: SignedOperation,
        deliver: SignedOperation,
    ) -> Vec<ExecutionStep> {
        let mut deliver = ExecutionStep::new(deliver, 2, StepKind::Deliver);
        if self.route.deliver_requires_bridge {
            deliver = deliver.depends_on(1);
        }

        vec![
            ExecutionStep::new(approve, 0, StepKind::Approve),
            ExecutionStep::new(send, 1, StepKind::SendToBridge)
                .depends_on(0)
                .with_settling_delay(self.route.settling_delay),
            deliver,
        ]
    }

    /// Lets the bridge send settle until the deliver account holds the amount to deliver.
    fn attach_probe(&self, steps: Vec<ExecutionStep>, request: &TransferRequest) -> Vec<ExecutionStep> {
        let holder =
            steps.iter().find(|step| step.kind == StepKind::Deliver).map(|step| step.op.sender());
        let probe = holder.zip(self.balances.provider(self.route.destination_chain)).map(
            |(holder, provider)| {
                Arc::new(BalanceProbe::new(
                    provider.clone(),
                    self.route.destination_token,
                    holder,
                    request.amount_to_destination,
                )) as Arc<dyn ArrivalProbe>
            },
        );

        steps
            .into_iter()
            .map(|step| match step.kind {
                StepKind::SendToBridge => step.with_probe(probe.clone()),
                _ => step,
            })
            .collect()
    }

    /// Persists the transfer record once delivery is final, then fetches the history of `wallet`,
    /// the smart account delivering on the destination chain.
    async fn record(
        &self,
        request: &TransferRequest,
        wallet: Address,
        recorded: bool,
        report: &mut TransferReport,
    ) {
        let delivery = match report.step(StepKind::Deliver).map(|step| &step.outcome) {
            Some(StepOutcome::Confirmed(_)) => Some(DeliveryStatus::Confirmed),
            Some(StepOutcome::Failed(_)) => Some(DeliveryStatus::Failed),
            Some(StepOutcome::Skipped(reason)) => {
                report.warnings.push(TransferWarning::DeliverySkipped(*reason));
                None
            }
            None => None,
        };

        if let Some(delivery) = delivery {
            if recorded {
                info!("Transfer already recorded");
            } else {
                let record = TransferRecord::new(
                    wallet,
                    request.receiver,
                    request.amount_to_destination,
                    delivery,
                );
                match self.records.save(&record).await {
                    Ok(()) => {
                        if let Err(err) = self.storage.mark_recorded(request.id).await {
                            warn!(%err, "Failed to journal persisted record");
                            report.warnings.push(TransferWarning::JournalOutdated(err.to_string()));
                        }
                        self.events.notify(
                            request.id,
                            Stage::Recorded,
                            format!("recorded {} with delivery {delivery}", record.amount_sent),
                        );
                        report.record = Some(record);
                    }
                    Err(err) => {
                        warn!(%err, "Failed to persist transfer record");
                        self.metrics.record_failures.increment(1);
                        report.warnings.push(TransferWarning::RecordPersistenceFailure(err.to_string()));
                    }
                }
            }
        }

        match self.records.history(wallet).await {
            Ok(history) => report.history = history,
            Err(err) => {
                warn!(%err, "Failed to fetch transfer history");
                report.warnings.push(TransferWarning::HistoryUnavailable(err.to_string()));
            }
        }
    }
}
