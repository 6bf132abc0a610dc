//! Transfer storage implementation backed by one JSON file per transfer.

use super::{
    StorageApi,
    api::{Result, TransferJournal},
};
use crate::{error::StorageError, execution::StepRecord, types::TransferId};
use async_trait::async_trait;
use std::{io::ErrorKind, path::PathBuf};
use tokio::sync::Mutex;

/// [`StorageApi`] implementation writing `<dir>/<transfer id>.json`.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a store in `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), lock: Mutex::new(()) }
    }

    fn path(&self, id: TransferId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: TransferId) -> Result<Option<TransferJournal>> {
        match tokio::fs::read(self.path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, journal: &TransferJournal) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path(journal.id());
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(journal)?).await?;
        tokio::fs::rename(tmp, path).await?;
        Ok(())
    }

    async fn update(&self, id: TransferId, f: impl FnOnce(&mut TransferJournal)) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut journal = self.read(id).await?.ok_or(StorageError::UnknownTransfer(id))?;
        f(&mut journal);
        self.write(&journal).await
    }
}

#[async_trait]
impl StorageApi for FileStorage {
    async fn read_journal(&self, id: TransferId) -> Result<Option<TransferJournal>> {
        self.read(id).await
    }

    async fn write_journal(&self, journal: &TransferJournal) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(journal).await
    }

    async fn write_step(&self, id: TransferId, order: u32, record: &StepRecord) -> Result<()> {
        self.update(id, |journal| {
            journal.statuses.insert(order, record.clone());
        })
        .await
    }

    async fn mark_recorded(&self, id: TransferId) -> Result<()> {
        self.update(id, |journal| journal.recorded = true).await
    }
}
