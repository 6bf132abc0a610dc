//! Transfer storage implementation in-memory.

use super::{
    StorageApi,
    api::{Result, TransferJournal},
};
use crate::{error::StorageError, execution::StepRecord, types::TransferId};
use async_trait::async_trait;
use dashmap::DashMap;

/// [`StorageApi`] implementation in-memory. Journals do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    journals: DashMap<TransferId, TransferJournal>,
}

#[async_trait]
impl StorageApi for InMemoryStorage {
    async fn read_journal(&self, id: TransferId) -> Result<Option<TransferJournal>> {
        Ok(self.journals.get(&id).map(|journal| journal.value().clone()))
    }

    async fn write_journal(&self, journal: &TransferJournal) -> Result<()> {
        self.journals.insert(journal.id(), journal.clone());
        Ok(())
    }

    async fn write_step(&self, id: TransferId, order: u32, record: &StepRecord) -> Result<()> {
        let mut journal = self.journals.get_mut(&id).ok_or(StorageError::UnknownTransfer(id))?;
        journal.statuses.insert(order, record.clone());
        Ok(())
    }

    async fn mark_recorded(&self, id: TransferId) -> Result<()> {
        let mut journal = self.journals.get_mut(&id).ok_or(StorageError::UnknownTransfer(id))?;
        journal.recorded = true;
        Ok(())
    }
}
