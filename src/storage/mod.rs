//! Transfer journal storage.
//!
//! The journal is what makes re-sending a transfer safe: once a plan is signed it is stored
//! together with the progress of every step, so a second invocation neither signs again nor
//! resubmits steps that already reached a final state.

mod api;
pub use api::{StorageApi, TransferJournal};
mod file;
mod memory;

use crate::{execution::StepRecord, types::TransferId};
use async_trait::async_trait;
use std::{path::PathBuf, sync::Arc};

/// Transfer storage interface.
#[derive(Debug, Clone)]
pub struct TransferStorage {
    inner: Arc<dyn StorageApi>,
}

impl TransferStorage {
    /// Create [`TransferStorage`] with a in-memory backend.
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(memory::InMemoryStorage::default()) }
    }

    /// Create [`TransferStorage`] keeping one JSON file per transfer in `dir`.
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self { inner: Arc::new(file::FileStorage::new(dir)) }
    }
}

#[async_trait]
impl StorageApi for TransferStorage {
    async fn read_journal(&self, id: TransferId) -> api::Result<Option<TransferJournal>> {
        self.inner.read_journal(id).await
    }

    async fn write_journal(&self, journal: &TransferJournal) -> api::Result<()> {
        self.inner.write_journal(journal).await
    }

    async fn write_step(&self, id: TransferId, order: u32, record: &StepRecord) -> api::Result<()> {
        self.inner.write_step(id, order, record).await
    }

    async fn mark_recorded(&self, id: TransferId) -> api::Result<()> {
        self.inner.mark_recorded(id).await
    }
}
