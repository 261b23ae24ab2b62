use super::backend::StorageBackend;
use super::LocalStore;
use crate::error::{FolioError, Result};
use crate::model::ReadingStateRecord;
use uuid::Uuid;

pub struct RecordStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
}

impl<B: StorageBackend> RecordStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn commit(&self, records: &std::collections::HashMap<Uuid, ReadingStateRecord>) -> Result<()> {
        self.backend.commit(records).map_err(|e| {
            log::error!(
                "commit to {} failed: {}",
                self.backend.location().display(),
                e
            );
            FolioError::LocalCommitFailed(e.to_string())
        })
    }
}

impl<B: StorageBackend> LocalStore for RecordStore<B> {
    fn find_all(&self) -> Result<Vec<ReadingStateRecord>> {
        let mut records: Vec<ReadingStateRecord> =
            self.backend.load_records()?.into_values().collect();
        // Ties broken by id so the order is stable across loads.
        records.sort_by(|a, b| {
            b.modification_date
                .cmp(&a.modification_date)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        Ok(records)
    }

    fn get(&self, id: &Uuid) -> Result<ReadingStateRecord> {
        self.backend
            .load_records()?
            .remove(id)
            .ok_or(FolioError::RecordNotFound(*id))
    }

    fn insert(&mut self, record: &ReadingStateRecord) -> Result<()> {
        let mut records = self.backend.load_records()?;
        if records.contains_key(&record.record_id) {
            return Err(FolioError::RecordExists(record.record_id));
        }
        records.insert(record.record_id, record.clone());
        self.commit(&records)
    }

    fn update(&mut self, record: &ReadingStateRecord) -> Result<()> {
        let mut records = self.backend.load_records()?;
        match records.get_mut(&record.record_id) {
            Some(slot) => *slot = record.clone(),
            None => return Err(FolioError::RecordNotFound(record.record_id)),
        }
        self.commit(&records)
    }

    fn delete(&mut self, id: &Uuid) -> Result<()> {
        let mut records = self.backend.load_records()?;
        if records.remove(id).is_none() {
            return Err(FolioError::RecordNotFound(*id));
        }
        self.commit(&records)
    }
}
