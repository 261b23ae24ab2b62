use super::{RemoteError, RemoteMirror, RemoteResult};
use crate::model::RemoteMirrorEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Shared in-memory mirror, standing in for the cloud record store in tests.
///
/// Clones share state, so one handle can be given to the engine while the test
/// inspects or rigs the "server" through another.
#[derive(Clone, Default)]
pub struct MemMirror {
    entries: Arc<Mutex<HashMap<Uuid, RemoteMirrorEntry>>>,
    simulate_transient_error: Arc<AtomicBool>,
}

impl MemMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_simulate_transient_error(&self, simulate: bool) {
        self.simulate_transient_error.store(simulate, Ordering::SeqCst);
    }

    /// Stores an entry without any ordering guard, as another device would.
    pub fn insert_raw(&self, entry: RemoteMirrorEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(entry.record_id, entry);
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<RemoteMirrorEntry> {
        self.entries.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> RemoteResult<MutexGuard<'_, HashMap<Uuid, RemoteMirrorEntry>>> {
        if self.simulate_transient_error.load(Ordering::SeqCst) {
            return Err(RemoteError::Transient("Simulated network error".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| RemoteError::Transient("mirror state poisoned".to_string()))
    }
}

impl RemoteMirror for MemMirror {
    fn fetch_by_short_path(&self, short_path: &str) -> RemoteResult<Vec<RemoteMirrorEntry>> {
        let entries = self.lock()?;
        let mut found: Vec<RemoteMirrorEntry> = entries
            .values()
            .filter(|e| e.short_path == short_path)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.modification_date.cmp(&a.modification_date));
        Ok(found)
    }

    fn fetch_by_record_id(&self, id: &Uuid) -> RemoteResult<RemoteMirrorEntry> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or(RemoteError::UnknownItem(*id))
    }

    fn save(&self, entry: &RemoteMirrorEntry) -> RemoteResult<()> {
        let mut entries = self.lock()?;
        if let Some(existing) = entries.get(&entry.record_id) {
            if existing.modification_date > entry.modification_date {
                log::debug!("ignoring stale save for {}", entry.record_id);
                return Ok(());
            }
        }
        entries.insert(entry.record_id, entry.clone());
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> RemoteResult<()> {
        self.lock()?.remove(id);
        Ok(())
    }
}
