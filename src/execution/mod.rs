//! Ordered execution of signed operations.
//!
//! The [`ExecutionSequencer`] submits the steps of a plan one after another, waits for each to
//! reach a final outcome and applies the [`SettlingPolicy`] between steps that need it. A failed
//! step never aborts the sequence: later steps either run or are skipped because a dependency
//! did not confirm.
//!
//! Every status transition is journaled in [`TransferStorage`], which is what allows a transfer
//! to be invoked again without resubmitting steps that already finished.

mod metrics;
pub use metrics::SequencerMetrics;

mod settling;
pub use settling::{ArrivalProbe, SettlingPolicy};

mod step;
pub use step::{ExecutionStep, StepKind, StepOutcome, StepRecord, StepStatus};

use crate::{
    accounts::{AccountResolver, Bundler},
    config::ExecutionConfig,
    constants::SUBMISSION_RETRY_BACKOFF,
    error::{SequenceError, SkipReason, StepFailure},
    events::{ProgressNotifier, Stage},
    storage::{StorageApi, TransferJournal, TransferStorage},
    types::TransferId,
};
use alloy::primitives::B256;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Submits execution plans step by step.
#[derive(Debug, Clone)]
pub struct ExecutionSequencer {
    accounts: Arc<dyn AccountResolver>,
    storage: TransferStorage,
    events: ProgressNotifier,
    config: ExecutionConfig,
    metrics: Arc<SequencerMetrics>,
}

impl ExecutionSequencer {
    /// Creates a new sequencer.
    pub fn new(
        accounts: Arc<dyn AccountResolver>,
        storage: TransferStorage,
        events: ProgressNotifier,
        config: ExecutionConfig,
    ) -> Self {
        Self { accounts, storage, events, config, metrics: Arc::new(SequencerMetrics::default()) }
    }

    /// Executes `steps` by ascending order and returns one outcome per step, in input order.
    ///
    /// Steps that the journal of `transfer_id` already knows as final are not submitted again.
    /// Once `cancel` fires, every step that was not yet submitted is skipped without being
    /// journaled, so invoking the transfer again picks it up. Fails without submitting anything
    /// if the journal cannot be read.
    #[instrument(skip_all, fields(%transfer_id, steps = steps.len()))]
    pub async fn execute(
        &self,
        transfer_id: TransferId,
        steps: &[ExecutionStep],
        cancel: &CancellationToken,
    ) -> Result<Vec<StepOutcome>, SequenceError> {
        validate_plan(steps)?;

        let journal = self.storage.read_journal(transfer_id).await.map_err(|err| {
            warn!(%err, "Failed to read transfer journal");
            SequenceError::JournalUnavailable { transfer_id, reason: err.to_string() }
        })?;

        let mut schedule: Vec<usize> = (0..steps.len()).collect();
        schedule.sort_by_key(|&idx| steps[idx].order);

        let mut confirmed = HashSet::new();
        let mut outcomes = Vec::with_capacity(steps.len());
        for (position, &idx) in schedule.iter().enumerate() {
            let step = &steps[idx];
            let (outcome, submitted) =
                self.run_step(transfer_id, step, journal.as_ref(), &confirmed, cancel).await;

            if outcome.is_confirmed() {
                confirmed.insert(step.order);
            }

            let later_pending = schedule[position + 1..].iter().any(|&next| {
                journal.as_ref().is_none_or(|journal| !journal.status(steps[next].order).is_final())
            });
            if submitted && later_pending && !step.settling_delay.is_zero() {
                self.settle(transfer_id, step, cancel).await;
            }

            outcomes.push((idx, outcome));
        }

        outcomes.sort_by_key(|(idx, _)| *idx);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Runs a single step to a final outcome.
    ///
    /// Also returns whether the operation reached the chain, which decides if the step settles.
    #[instrument(skip_all, fields(order = step.order, kind = %step.kind, chain_id = step.op.chain_id()))]
    async fn run_step(
        &self,
        transfer_id: TransferId,
        step: &ExecutionStep,
        journal: Option<&TransferJournal>,
        confirmed: &HashSet<u32>,
        cancel: &CancellationToken,
    ) -> (StepOutcome, bool) {
        let status = journal.map(|journal| journal.status(step.order)).unwrap_or(StepStatus::Pending);

        if let Some(outcome) = journal.and_then(|journal| journal.outcome(step.order)) {
            debug!(?status, "Step already final, not resubmitting");
            self.metrics.resumed.increment(1);
            self.notify_outcome(transfer_id, step, outcome, "from journal");
            return (outcome.clone(), reached_chain(outcome));
        }

        let user_op_hash = match status {
            StepStatus::Submitted(user_op_hash) => {
                info!(%user_op_hash, "Resuming confirmation of submitted step");
                self.metrics.resumed.increment(1);
                Some(user_op_hash)
            }
            _ => None,
        };

        if user_op_hash.is_none() {
            // not journaled: the step stays pending so the next invocation submits it
            if cancel.is_cancelled() {
                let outcome = StepOutcome::Skipped(SkipReason::Cancelled);
                self.tally(step, &outcome);
                self.notify_outcome(transfer_id, step, &outcome, "");
                return (outcome, false);
            }

            if let Some(order) = step.depends_on
                && !confirmed.contains(&order)
            {
                let outcome = StepOutcome::Skipped(SkipReason::DependencyNotConfirmed { order });
                return (self.finish(transfer_id, step, status, outcome).await, false);
            }
        }

        let bundler = match self.accounts.resolve(step.op.chain_id()).await {
            Ok(account) => account.bundler,
            Err(err) => {
                let outcome = StepOutcome::Failed(StepFailure::AccountUnavailable {
                    chain_id: step.op.chain_id(),
                    reason: err.to_string(),
                });
                return (self.finish(transfer_id, step, status, outcome).await, false);
            }
        };

        let user_op_hash = match user_op_hash {
            Some(user_op_hash) => user_op_hash,
            None => match self.submit(bundler.as_ref(), step).await {
                Ok(user_op_hash) => {
                    self.metrics.submitted.increment(1);
                    let record = StepRecord::submitted(user_op_hash);
                    self.journal(transfer_id, step, status, record).await;
                    self.events.notify(
                        transfer_id,
                        Stage::Submitted(step.kind),
                        format!("{} submitted as {user_op_hash}", step.kind),
                    );
                    user_op_hash
                }
                Err(failure) => {
                    let outcome = StepOutcome::Failed(failure);
                    return (self.finish(transfer_id, step, status, outcome).await, false);
                }
            },
        };

        let outcome = self.wait_for_receipt(bundler.as_ref(), user_op_hash).await;
        let status = StepStatus::Submitted(user_op_hash);
        (self.finish(transfer_id, step, status, outcome).await, true)
    }

    /// Submits the step, retrying transport failures.
    async fn submit(&self, bundler: &dyn Bundler, step: &ExecutionStep) -> Result<B256, StepFailure> {
        let max_attempts = self.config.max_submission_attempts.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match bundler.send_user_operation(step.op.op(), step.op.entrypoint()).await {
                Ok(user_op_hash) => {
                    if user_op_hash != step.op.hash() {
                        warn!(%user_op_hash, expected = %step.op.hash(), "Bundler returned unexpected user operation hash");
                    }
                    return Ok(user_op_hash);
                }
                Err(err) if err.is_retryable() && attempts < max_attempts => {
                    warn!(%err, attempts, "Submission failed, retrying");
                    sleep(SUBMISSION_RETRY_BACKOFF).await;
                }
                Err(err) => {
                    warn!(%err, attempts, "Submission failed");
                    return Err(StepFailure::Submission { attempts, reason: err.to_string() });
                }
            }
        }
    }

    /// Polls the bundler until the operation is included or the confirmation timeout passes.
    async fn wait_for_receipt(&self, bundler: &dyn Bundler, user_op_hash: B256) -> StepOutcome {
        let started = Instant::now();
        let deadline = started + self.config.confirmation_timeout;
        loop {
            match bundler.user_operation_receipt(user_op_hash).await {
                Ok(Some(receipt)) => {
                    self.metrics.confirmation_time.record(started.elapsed().as_millis() as f64);
                    return if receipt.success {
                        StepOutcome::Confirmed(receipt)
                    } else {
                        StepOutcome::Failed(StepFailure::Reverted {
                            user_op_hash,
                            reason: receipt.reason,
                        })
                    };
                }
                Ok(None) => {}
                Err(err) => debug!(%err, %user_op_hash, "Receipt query failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                return StepOutcome::Failed(StepFailure::Timeout {
                    user_op_hash,
                    waited_secs: self.config.confirmation_timeout.as_secs(),
                });
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// Waits after a step per the settling policy. Returns early on cancellation.
    async fn settle(&self, transfer_id: TransferId, step: &ExecutionStep, cancel: &CancellationToken) {
        self.events.notify(
            transfer_id,
            Stage::Settling(step.kind),
            format!("waiting at least {:?} after {}", step.settling_delay, step.kind),
        );

        let started = Instant::now();
        tokio::select! {
            arrived = self.config.settling.settle(step.settling_delay, step.probe.as_deref()) => {
                debug!(arrived, order = step.order, "Settled");
            }
            _ = cancel.cancelled() => {
                info!(order = step.order, "Cancelled while settling");
            }
        }
        self.metrics.settling_time.record(started.elapsed().as_millis() as f64);
    }

    /// Journals a final outcome, counts it and emits the matching event.
    async fn finish(
        &self,
        transfer_id: TransferId,
        step: &ExecutionStep,
        from: StepStatus,
        outcome: StepOutcome,
    ) -> StepOutcome {
        self.tally(step, &outcome);
        self.journal(transfer_id, step, from, StepRecord::finished(outcome.clone())).await;
        self.notify_outcome(transfer_id, step, &outcome, "");
        outcome
    }

    fn tally(&self, step: &ExecutionStep, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Confirmed(_) => self.metrics.confirmed.increment(1),
            StepOutcome::Failed(failure) => {
                warn!(%failure, order = step.order, "Step failed");
                self.metrics.failed.increment(1)
            }
            StepOutcome::Skipped(reason) => {
                info!(%reason, order = step.order, "Step skipped");
                self.metrics.skipped.increment(1)
            }
        }
    }

    async fn journal(
        &self,
        transfer_id: TransferId,
        step: &ExecutionStep,
        from: StepStatus,
        record: StepRecord,
    ) {
        if !from.can_transition_to(&record.status) {
            warn!(?from, to = ?record.status, order = step.order, "Unexpected step transition");
        }
        if let Err(err) = self.storage.write_step(transfer_id, step.order, &record).await {
            warn!(%err, order = step.order, "Failed to journal step");
        }
    }

    fn notify_outcome(
        &self,
        transfer_id: TransferId,
        step: &ExecutionStep,
        outcome: &StepOutcome,
        note: &str,
    ) {
        let (stage, mut message) = match outcome {
            StepOutcome::Confirmed(receipt) => (
                Stage::Confirmed(step.kind),
                format!("{} included in {}", step.kind, receipt.receipt.transaction_hash),
            ),
            StepOutcome::Failed(failure) => (Stage::Failed(step.kind), failure.to_string()),
            StepOutcome::Skipped(reason) => (Stage::Skipped(step.kind), reason.to_string()),
        };
        if !note.is_empty() {
            message = format!("{message} ({note})");
        }
        self.events.notify(transfer_id, stage, message);
    }
}

/// Checks that orders are unique and that every dependency runs before its dependent.
fn validate_plan(steps: &[ExecutionStep]) -> Result<(), SequenceError> {
    let mut orders = HashMap::with_capacity(steps.len());
    for step in steps {
        if orders.insert(step.order, step.kind).is_some() {
            return Err(SequenceError::DuplicateOrder(step.order));
        }
    }

    for step in steps {
        if let Some(depends_on) = step.depends_on
            && (depends_on >= step.order || !orders.contains_key(&depends_on))
        {
            return Err(SequenceError::InvalidDependency { order: step.order, depends_on });
        }
    }

    Ok(())
}

/// Whether an outcome implies the operation was accepted by a bundler.
fn reached_chain(outcome: &StepOutcome) -> bool {
    matches!(
        outcome,
        StepOutcome::Confirmed(_)
            | StepOutcome::Failed(StepFailure::Reverted { .. } | StepFailure::Timeout { .. })
    )
}
