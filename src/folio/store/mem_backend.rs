use super::backend::StorageBackend;
use crate::error::{FolioError, Result};
use crate::model::ReadingStateRecord;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since reconciliation is
/// single-threaded. This keeps `StorageBackend` on `&self`.
#[derive(Default)]
pub struct MemBackend {
    records: RefCell<HashMap<Uuid, ReadingStateRecord>>,
    commits: Cell<usize>,
    simulate_commit_error: Cell<bool>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable commit failure simulation for testing fatal-error handling.
    pub fn set_simulate_commit_error(&self, simulate: bool) {
        self.simulate_commit_error.set(simulate);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.get()
    }
}

impl StorageBackend for MemBackend {
    fn load_records(&self) -> Result<HashMap<Uuid, ReadingStateRecord>> {
        Ok(self.records.borrow().clone())
    }

    fn commit(&self, records: &HashMap<Uuid, ReadingStateRecord>) -> Result<()> {
        if self.simulate_commit_error.get() {
            return Err(FolioError::Store("Simulated commit error".to_string()));
        }
        *self.records.borrow_mut() = records.clone();
        self.commits.set(self.commits.get() + 1);
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("memory://records")
    }
}
