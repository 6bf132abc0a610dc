//! Transfer journal storage api.

use crate::{
    error::StorageError,
    execution::{ExecutionStep, StepOutcome, StepRecord, StepStatus},
    types::{TransferId, TransferRequest},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Debug};

/// Type alias for `Result<T, StorageError>`
pub type Result<T> = core::result::Result<T, StorageError>;

/// Everything needed to resume a transfer: the request, the signed plan and per-step progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferJournal {
    /// The request.
    pub request: TransferRequest,
    /// The signed execution plan.
    pub steps: Vec<ExecutionStep>,
    /// Progress per step order. Steps without an entry are pending.
    #[serde(default)]
    pub statuses: BTreeMap<u32, StepRecord>,
    /// Whether the transfer record was persisted.
    #[serde(default)]
    pub recorded: bool,
    /// When the plan was signed.
    pub created_at: DateTime<Utc>,
}

impl TransferJournal {
    /// Creates a journal for a freshly signed plan.
    pub fn new(request: TransferRequest, steps: Vec<ExecutionStep>) -> Self {
        Self { request, steps, statuses: BTreeMap::new(), recorded: false, created_at: Utc::now() }
    }

    /// The transfer id.
    pub fn id(&self) -> TransferId {
        self.request.id
    }

    /// Status of the step with `order`.
    pub fn status(&self, order: u32) -> StepStatus {
        self.statuses.get(&order).map(|record| record.status).unwrap_or(StepStatus::Pending)
    }

    /// Final outcome of the step with `order`, if it has one.
    pub fn outcome(&self, order: u32) -> Option<&StepOutcome> {
        self.statuses.get(&order).and_then(|record| record.outcome.as_ref())
    }
}

/// Storage API.
#[async_trait]
pub trait StorageApi: Debug + Send + Sync {
    /// Reads the journal of a transfer.
    async fn read_journal(&self, id: TransferId) -> Result<Option<TransferJournal>>;

    /// Writes a journal, replacing any previous one for the same transfer.
    async fn write_journal(&self, journal: &TransferJournal) -> Result<()>;

    /// Updates the journal entry of one step.
    async fn write_step(&self, id: TransferId, order: u32, record: &StepRecord) -> Result<()>;

    /// Marks the transfer record as persisted.
    async fn mark_recorded(&self, id: TransferId) -> Result<()>;
}
