//! # Reconciliation Engine
//!
//! [`Reconciler`] decides what reading state a document opens with and writes
//! the result back when it closes. It owns the local store, the identity
//! resolver, and an optional link to the remote mirror.
//!
//! ## Lifecycle of One Document
//!
//! ```text
//! Idle ─▶ IdentityResolving ─▶ LocalLoaded ─▶ RemoteChecking ─▶ Reconciled
//!                                   │                               │
//!                                   └──────(no mirror)──────────────┤
//!                                                                   ▼
//!                                                   Closing ─▶ Persisted
//! ```
//!
//! 1. **Open**: mint a token for the path, sweep the library (purge, refresh,
//!    collapse), apply the matching local record to a fresh
//!    [`ReadingSession`] immediately, and fire a mirror lookup in the
//!    background. The caller never waits on the network.
//! 2. **Remote result**: drained on this context by
//!    [`Reconciler::process_remote_events`]. [`merge::decide`] compares it with
//!    the local record. A newer entry on a different page becomes a
//!    [`MergePrompt`]; everything else keeps local state silently.
//! 3. **Close**: snapshot the session, stamp `modification_date`, update or
//!    insert the local record, then push a mirror entry and delete any remote
//!    duplicates, fire-and-forget.
//!
//! ## Failure Rules
//!
//! - Local commit failure is fatal. The engine is poisoned and every later
//!   call returns [`FolioError::StorePoisoned`].
//! - Mirror failures are logged and dropped. A transient failure during the
//!   lookup also skips the push on close, so nothing is created blind.
//! - Results that arrive after their document closed carry a stale
//!   [`SessionTicket`] and are ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{FolioError, Result};
use crate::identity::{IdentityResolver, IdentityToken};
use crate::model::{DeviceOrientation, ReadingStateRecord, RemoteMirrorEntry};
use crate::remote::{
    Dispatcher, FetchOutcome, RemoteEvent, RemoteLink, RemoteMirror, SessionTicket,
};
use crate::session::{display_page_index, NavigationTarget, ReadingSession};
use crate::store::LocalStore;

pub mod merge;
pub mod sweep;

pub use merge::{decide, MergeDecision, MergePrompt};
pub use sweep::{LibraryEntry, SweepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    IdentityResolving,
    LocalLoaded,
    RemoteChecking,
    Reconciled,
    Closing,
    Persisted,
}

/// What the mirror lookup for the open document has told us so far.
#[derive(Debug, Clone, PartialEq)]
enum RemoteState {
    Disabled,
    Pending,
    Found {
        newest: RemoteMirrorEntry,
        duplicates: Vec<Uuid>,
    },
    Absent,
    Unavailable,
}

struct OpenDocument {
    ticket: SessionTicket,
    location: PathBuf,
    token: IdentityToken,
    short_path: String,
    record: Option<ReadingStateRecord>,
    session: ReadingSession,
    phase: Phase,
    remote: RemoteState,
    prompt: Option<MergePrompt>,
}

pub struct Reconciler<S: LocalStore, R: IdentityResolver> {
    store: S,
    resolver: R,
    remote: Option<RemoteLink>,
    device: String,
    open: Option<OpenDocument>,
    next_ticket: u64,
    last_phase: Phase,
    poisoned: bool,
}

impl<S: LocalStore, R: IdentityResolver> Reconciler<S, R> {
    pub fn new(store: S, resolver: R, device: impl Into<String>) -> Self {
        Self {
            store,
            resolver,
            remote: None,
            device: device.into(),
            open: None,
            next_ticket: 1,
            last_phase: Phase::Idle,
            poisoned: false,
        }
    }

    pub fn with_remote(
        mut self,
        mirror: Arc<dyn RemoteMirror>,
        dispatcher: Box<dyn Dispatcher>,
    ) -> Self {
        self.remote = Some(RemoteLink::new(mirror, dispatcher));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn phase(&self) -> Phase {
        self.open
            .as_ref()
            .map(|doc| doc.phase)
            .unwrap_or(self.last_phase)
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn current_location(&self) -> Option<&Path> {
        self.open.as_ref().map(|doc| doc.location.as_path())
    }

    pub fn session(&self) -> Option<&ReadingSession> {
        self.open.as_ref().map(|doc| &doc.session)
    }

    pub fn session_mut(&mut self) -> Option<&mut ReadingSession> {
        self.open.as_mut().map(|doc| &mut doc.session)
    }

    pub fn pending_prompt(&self) -> Option<&MergePrompt> {
        self.open.as_ref().and_then(|doc| doc.prompt.as_ref())
    }

    fn ensure_healthy(&self) -> Result<()> {
        if self.poisoned {
            return Err(FolioError::StorePoisoned);
        }
        Ok(())
    }

    /// Poisons the engine if `result` carries a fatal store error.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                log::error!("local store failed, refusing further work: {}", e);
                self.poisoned = true;
            }
        }
        result
    }

    fn run_sweep(&mut self) -> Result<sweep::Sweep> {
        let outcome = sweep::sweep(&mut self.store, &self.resolver);
        let result = self.check(outcome)?;
        if let Some(link) = self.remote.as_mut() {
            for id in &result.collapsed_ids {
                link.delete(*id);
            }
        }
        Ok(result)
    }

    fn resolve_location(&self, location: &Path) -> Result<(IdentityToken, PathBuf)> {
        let token = self.resolver.create_token(location)?;
        let resolved = self.resolver.resolve(&token)?;
        Ok((token, resolved.location))
    }

    /// All known documents, most recently read first. Repairs the store as it goes.
    pub fn list_documents(&mut self) -> Result<Vec<LibraryEntry>> {
        self.ensure_healthy()?;
        Ok(self.run_sweep()?.entries)
    }

    pub fn sweep(&mut self) -> Result<SweepReport> {
        self.ensure_healthy()?;
        Ok(self.run_sweep()?.report)
    }

    /// The stored entry for a document, without opening it.
    pub fn find_document(&mut self, location: &Path) -> Result<Option<LibraryEntry>> {
        self.ensure_healthy()?;
        let (_, canonical) = self.resolve_location(location)?;
        let entries = self.run_sweep()?.entries;
        Ok(entries.into_iter().find(|entry| entry.location == canonical))
    }

    pub fn open(
        &mut self,
        location: &Path,
        orientation: DeviceOrientation,
    ) -> Result<&mut ReadingSession> {
        self.ensure_healthy()?;
        if let Some(doc) = &self.open {
            return Err(FolioError::DocumentAlreadyOpen(doc.location.clone()));
        }

        self.last_phase = Phase::IdentityResolving;
        let (token, canonical) = match self.resolve_location(location) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.last_phase = Phase::Idle;
                return Err(e);
            }
        };

        let entries = match self.run_sweep() {
            Ok(swept) => swept.entries,
            Err(e) => {
                self.last_phase = Phase::Idle;
                return Err(e);
            }
        };
        let record = entries
            .into_iter()
            .find(|entry| entry.location == canonical)
            .map(|entry| entry.record);

        let mut session = ReadingSession::new(orientation);
        if let Some(record) = &record {
            session.apply(record);
        }
        let short_path = self.resolver.short_key(&canonical);
        let ticket = SessionTicket(self.next_ticket);
        self.next_ticket += 1;

        log::debug!(
            "opened {} ({}, page {})",
            canonical.display(),
            if record.is_some() { "known" } else { "new" },
            session.page_index()
        );

        let mut doc = OpenDocument {
            ticket,
            location: canonical,
            token,
            short_path,
            record,
            session,
            phase: Phase::LocalLoaded,
            remote: RemoteState::Disabled,
            prompt: None,
        };

        match self.remote.as_mut() {
            Some(link) => {
                let fallback = doc.record.as_ref().map(|r| r.record_id);
                link.fetch(ticket, doc.short_path.clone(), fallback);
                doc.remote = RemoteState::Pending;
                doc.phase = Phase::RemoteChecking;
            }
            None => doc.phase = Phase::Reconciled,
        }

        Ok(&mut self.open.insert(doc).session)
    }

    /// Applies finished remote work. Returns a prompt if one was surfaced.
    pub fn process_remote_events(&mut self) -> Option<MergePrompt> {
        let events = self.remote.as_mut()?.drain();
        self.handle_events(events)
    }

    /// Waits up to `timeout` for in-flight remote work, then applies it.
    pub fn flush_remote(&mut self, timeout: Duration) -> Option<MergePrompt> {
        let events = self.remote.as_mut()?.wait(timeout);
        self.handle_events(events)
    }

    fn handle_events(&mut self, events: Vec<RemoteEvent>) -> Option<MergePrompt> {
        let mut surfaced = None;
        for event in events {
            match event {
                RemoteEvent::Fetched { ticket, outcome } => {
                    match self.open.as_mut().filter(|doc| doc.ticket == ticket) {
                        Some(doc) => {
                            if let Some(prompt) = apply_fetch(doc, outcome) {
                                surfaced = Some(prompt);
                            }
                        }
                        None => log::debug!("dropping remote lookup for closed session {:?}", ticket),
                    }
                }
                RemoteEvent::Saved { record_id, result } => match result {
                    Ok(()) => log::debug!("mirrored {}", record_id),
                    Err(e) => log::warn!("mirror save for {} failed: {}", record_id, e),
                },
                RemoteEvent::Deleted { record_id, result } => match result {
                    Ok(()) => log::debug!("removed mirror entry {}", record_id),
                    Err(e) => log::warn!("mirror delete for {} failed: {}", record_id, e),
                },
            }
        }
        surfaced
    }

    /// Jumps to the offered remote page. Returns false if nothing was pending.
    pub fn accept_remote_page(&mut self, target: &mut dyn NavigationTarget) -> Result<bool> {
        let doc = self.open.as_mut().ok_or(FolioError::NoOpenDocument)?;
        let Some(prompt) = doc.prompt.take() else {
            return Ok(false);
        };
        doc.session.go_to_page(prompt.page_index);
        let rtl = doc.session.preferences().reads_right_to_left();
        target.go_to_page(display_page_index(prompt.page_index, target.page_count(), rtl));
        log::info!("moved to page {} from {}", prompt.page_index, prompt.device);
        Ok(true)
    }

    pub fn decline_remote_page(&mut self) -> Result<bool> {
        let doc = self.open.as_mut().ok_or(FolioError::NoOpenDocument)?;
        Ok(doc.prompt.take().is_some())
    }

    /// Persists the open document and pushes it to the mirror.
    pub fn close(&mut self) -> Result<ReadingStateRecord> {
        self.ensure_healthy()?;
        let mut doc = self.open.take().ok_or(FolioError::NoOpenDocument)?;
        doc.phase = Phase::Closing;
        self.last_phase = Phase::Closing;

        if doc.prompt.take().is_some() {
            log::debug!("closing with an unanswered remote prompt; keeping local page");
        }

        let existed = doc.record.is_some();
        let mut record = match doc.record.take() {
            Some(record) => record,
            None => {
                let id = match &doc.remote {
                    RemoteState::Found { newest, .. } => newest.record_id,
                    _ => Uuid::new_v4(),
                };
                ReadingStateRecord::with_id(id, doc.token.clone())
            }
        };
        record.identity_token = doc.token.clone();
        doc.session.current_snapshot().merge_into(&mut record);
        record.touch();

        let written = if existed {
            match self.store.update(&record) {
                // Purged by a sweep while open; write it back fresh.
                Err(FolioError::RecordNotFound(_)) => self.store.insert(&record),
                other => other,
            }
        } else {
            self.store.insert(&record)
        };
        self.check(written)?;

        if let Some(link) = self.remote.as_mut() {
            match &doc.remote {
                RemoteState::Disabled => {}
                RemoteState::Unavailable => {
                    log::info!("mirror unavailable this cycle; not pushing {}", record.record_id)
                }
                state => {
                    link.save(RemoteMirrorEntry::from_record(
                        &record,
                        &doc.short_path,
                        &self.device,
                    ));
                    if let RemoteState::Found { newest, duplicates } = state {
                        let stale = std::iter::once(&newest.record_id).chain(duplicates.iter());
                        for id in stale.filter(|id| **id != record.record_id) {
                            link.delete(*id);
                        }
                    }
                }
            }
        }

        log::debug!(
            "persisted {} at page {}",
            doc.location.display(),
            record.page_index
        );
        self.last_phase = Phase::Persisted;
        Ok(record)
    }

    /// Drops the stored state for a document, locally and in the mirror.
    pub fn forget(&mut self, location: &Path) -> Result<Option<ReadingStateRecord>> {
        self.ensure_healthy()?;
        let Some(entry) = self.find_document(location)? else {
            return Ok(None);
        };
        if self.current_location() == Some(entry.location.as_path()) {
            return Err(FolioError::DocumentAlreadyOpen(entry.location));
        }

        let deleted = self.store.delete(&entry.record.record_id);
        self.check(deleted)?;
        if let Some(link) = self.remote.as_mut() {
            link.delete(entry.record.record_id);
        }
        Ok(Some(entry.record))
    }
}

fn apply_fetch(doc: &mut OpenDocument, outcome: FetchOutcome) -> Option<MergePrompt> {
    let mut surfaced = None;
    doc.remote = match outcome {
        FetchOutcome::Found(mut entries) if !entries.is_empty() => {
            entries.sort_by(|a, b| b.modification_date.cmp(&a.modification_date));
            let newest = entries.remove(0);
            let local_modified = doc.record.as_ref().map(|r| r.modification_date);
            if let MergeDecision::OfferRemotePage(prompt) =
                merge::decide(local_modified, doc.session.page_index(), &newest)
            {
                log::info!(
                    "{} has a newer position (page {}) from {}",
                    doc.short_path,
                    prompt.page_index,
                    prompt.device
                );
                doc.prompt = Some(prompt.clone());
                surfaced = Some(prompt);
            }
            RemoteState::Found {
                newest,
                duplicates: entries.into_iter().map(|e| e.record_id).collect(),
            }
        }
        FetchOutcome::Found(_) | FetchOutcome::Absent => RemoteState::Absent,
        FetchOutcome::Unavailable(reason) => {
            log::warn!("mirror lookup for {} failed: {}", doc.short_path, reason);
            RemoteState::Unavailable
        }
    };
    doc.phase = Phase::Reconciled;
    surfaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::memory::MemResolver;
    use crate::model::{Point, ScrollAxis};
    use crate::remote::memory::MemMirror;
    use crate::remote::ManualDispatcher;
    use crate::store::mem_backend::MemBackend;
    use crate::store::record_store::RecordStore;
    use crate::test_utils::{minutes_ago, RecordingNavigator};
    use chrono::Duration as ChronoDuration;

    type Engine = Reconciler<RecordStore<MemBackend>, MemResolver>;

    struct Rig {
        engine: Engine,
        mirror: MemMirror,
        dispatcher: ManualDispatcher,
    }

    fn local_only() -> Engine {
        Reconciler::new(
            RecordStore::with_backend(MemBackend::new()),
            MemResolver::default(),
            "tablet",
        )
    }

    fn with_mirror() -> Rig {
        let mirror = MemMirror::new();
        let dispatcher = ManualDispatcher::new();
        let engine = local_only().with_remote(Arc::new(mirror.clone()), Box::new(dispatcher.clone()));
        Rig {
            engine,
            mirror,
            dispatcher,
        }
    }

    impl Rig {
        /// Runs every queued remote job and applies the results.
        fn settle(&mut self) -> Option<MergePrompt> {
            self.dispatcher.run_all();
            self.engine.process_remote_events()
        }
    }

    fn read_and_close(engine: &mut Engine, path: &Path, page: usize) -> ReadingStateRecord {
        engine
            .open(path, DeviceOrientation::Portrait)
            .unwrap()
            .go_to_page(page);
        engine.close().unwrap()
    }

    #[test]
    fn test_first_close_creates_one_record() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");

        assert_eq!(engine.phase(), Phase::Idle);
        let record = read_and_close(&mut engine, &path, 5);

        assert_eq!(record.page_index, 5);
        assert_eq!(record.identity_token.last_known_path(), path);
        assert_eq!(engine.store().find_all().unwrap(), vec![record]);
        assert_eq!(engine.phase(), Phase::Persisted);
    }

    #[test]
    fn test_reopen_restores_and_updates_same_record() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");
        let first = read_and_close(&mut engine, &path, 5);

        let session = engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(session.page_index(), 5);
        session.go_to_page(9);
        let second = engine.close().unwrap();

        assert_eq!(second.record_id, first.record_id);
        assert_eq!(second.creation_date, first.creation_date);
        assert!(second.modification_date > first.modification_date);
        assert_eq!(engine.store().find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_without_mirror_open_is_reconciled_immediately() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");

        engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(engine.phase(), Phase::Reconciled);
    }

    #[test]
    fn test_open_twice_is_an_error() {
        let mut engine = local_only();
        let a = engine.resolver().add_file("a.pdf");
        let b = engine.resolver().add_file("b.pdf");

        engine.open(&a, DeviceOrientation::Portrait).unwrap();
        assert!(matches!(
            engine.open(&b, DeviceOrientation::Portrait),
            Err(FolioError::DocumentAlreadyOpen(_))
        ));
    }

    #[test]
    fn test_close_without_open() {
        let mut engine = local_only();
        assert!(matches!(engine.close(), Err(FolioError::NoOpenDocument)));
    }

    #[test]
    fn test_open_surfaces_identity_creation_failure() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");
        engine.resolver().set_simulate_creation_error(true);

        assert!(matches!(
            engine.open(&path, DeviceOrientation::Portrait),
            Err(FolioError::IdentityCreationFailed { .. })
        ));
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.store().find_all().unwrap().is_empty());
    }

    #[test]
    fn test_renamed_document_keeps_its_record() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");
        let first = read_and_close(&mut engine, &path, 4);

        let moved = PathBuf::from("/library/renamed.pdf");
        engine.resolver().rename(&path, &moved);

        let session = engine.open(&moved, DeviceOrientation::Portrait).unwrap();
        assert_eq!(session.page_index(), 4);
        let second = engine.close().unwrap();

        assert_eq!(second.record_id, first.record_id);
        assert_eq!(second.identity_token.last_known_path(), moved);
    }

    #[test]
    fn test_open_collapses_duplicates_to_newest() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");
        let token = engine.resolver().create_token(&path).unwrap();

        let mut old = ReadingStateRecord::new(token.clone());
        old.page_index = 1;
        old.modification_date = minutes_ago(60);
        let mut newest = ReadingStateRecord::new(token);
        newest.page_index = 2;
        newest.modification_date = minutes_ago(1);
        engine.store.insert(&old).unwrap();
        engine.store.insert(&newest).unwrap();

        let session = engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(session.page_index(), 2);

        let remaining = engine.store().find_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].record_id, newest.record_id);
    }

    #[test]
    fn test_list_documents_purges_deleted_files() {
        let mut engine = local_only();
        let a = engine.resolver().add_file("a.pdf");
        let b = engine.resolver().add_file("b.pdf");
        read_and_close(&mut engine, &a, 1);
        read_and_close(&mut engine, &b, 2);

        engine.resolver().remove(&a);
        let listed = engine.list_documents().unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].location, b);
        assert_eq!(engine.store().find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_failure_poisons_engine() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");
        engine.open(&path, DeviceOrientation::Portrait).unwrap();
        engine.store().backend().set_simulate_commit_error(true);

        assert!(matches!(
            engine.close(),
            Err(FolioError::LocalCommitFailed(_))
        ));
        assert!(engine.is_poisoned());

        engine.store().backend().set_simulate_commit_error(false);
        assert!(matches!(
            engine.open(&path, DeviceOrientation::Portrait),
            Err(FolioError::StorePoisoned)
        ));
        assert!(matches!(
            engine.list_documents(),
            Err(FolioError::StorePoisoned)
        ));
    }

    #[test]
    fn test_failed_sweep_during_open_leaves_engine_idle() {
        let mut engine = local_only();
        let gone = engine.resolver().add_file("gone.pdf");
        let path = engine.resolver().add_file("a.pdf");
        read_and_close(&mut engine, &gone, 3);
        engine.resolver().remove(&gone);
        engine.store().backend().set_simulate_commit_error(true);

        assert!(matches!(
            engine.open(&path, DeviceOrientation::Portrait),
            Err(FolioError::LocalCommitFailed(_))
        ));
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.session().is_none());
    }

    #[test]
    fn test_preferences_and_orientation_state_persist() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");

        let session = engine.open(&path, DeviceOrientation::Portrait).unwrap();
        session.report_offset(Point::new(1.0, 2.0));
        session.set_device_orientation(DeviceOrientation::Landscape);
        session.report_offset(Point::new(10.0, 20.0));
        session.set_horizontal_scroll(true);
        session.report_scale(1.25);
        session.set_find_on_page(true);
        let record = engine.close().unwrap();

        assert_eq!(record.offsets.portrait, Point::new(1.0, 2.0));
        assert_eq!(record.offsets.landscape, Point::new(10.0, 20.0));
        assert_eq!(
            record
                .scale_factors
                .get(ScrollAxis::Horizontal, DeviceOrientation::Landscape),
            1.25
        );
        assert!(record.preferences.is_horizontal_scroll);
        assert!(record.preferences.is_find_on_page_enabled);
    }

    // --- Mirror reconciliation ---

    #[test]
    fn test_open_does_not_wait_for_mirror() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        read_and_close(&mut rig.engine, &path, 3);
        rig.settle();

        let session = rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(session.page_index(), 3);
        assert_eq!(rig.engine.phase(), Phase::RemoteChecking);

        rig.settle();
        assert_eq!(rig.engine.phase(), Phase::Reconciled);
    }

    #[test]
    fn test_close_pushes_mirror_entry() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("books/a.pdf");

        let record = read_and_close(&mut rig.engine, &path, 6);
        rig.settle();

        let entry = rig.mirror.get(&record.record_id).unwrap();
        assert_eq!(entry.page_index, 6);
        assert_eq!(entry.short_path, "books/a.pdf");
        assert_eq!(entry.device, "tablet");
        assert_eq!(entry.modification_date, record.modification_date);
    }

    /// Backdates the local record and puts a newer mirror entry for it on `page`.
    fn remote_ahead(rig: &mut Rig, local: &ReadingStateRecord, page: usize) {
        let mut backdated = local.clone();
        backdated.modification_date = minutes_ago(10);
        rig.engine.store.update(&backdated).unwrap();
        rig.mirror.insert_raw(RemoteMirrorEntry {
            record_id: local.record_id,
            page_index: page,
            modification_date: minutes_ago(5),
            short_path: "a.pdf".to_string(),
            device: "phone".to_string(),
        });
    }

    #[test]
    fn test_newer_remote_same_page_is_silent() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        remote_ahead(&mut rig, &local, 3);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(rig.settle(), None);
        assert!(rig.engine.pending_prompt().is_none());
    }

    #[test]
    fn test_newer_remote_other_page_prompts_and_accept_moves() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        remote_ahead(&mut rig, &local, 7);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        let prompt = rig.settle().unwrap();
        assert_eq!(prompt.page_index, 7);
        assert_eq!(prompt.device, "phone");

        let mut nav = RecordingNavigator::with_pages(20);
        assert!(rig.engine.accept_remote_page(&mut nav).unwrap());
        assert_eq!(rig.engine.session().unwrap().page_index(), 7);
        assert_eq!(nav.visited, vec![7]);

        let closed = rig.engine.close().unwrap();
        assert_eq!(closed.page_index, 7);
    }

    #[test]
    fn test_declining_prompt_keeps_local_page() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        remote_ahead(&mut rig, &local, 7);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert!(rig.settle().is_some());
        assert!(rig.engine.decline_remote_page().unwrap());

        assert_eq!(rig.engine.session().unwrap().page_index(), 3);
        assert_eq!(rig.engine.close().unwrap().page_index, 3);
    }

    #[test]
    fn test_older_remote_never_changes_page() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        rig.mirror.insert_raw(RemoteMirrorEntry {
            record_id: local.record_id,
            page_index: 50,
            modification_date: local.modification_date - ChronoDuration::minutes(5),
            short_path: "a.pdf".to_string(),
            device: "phone".to_string(),
        });

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(rig.settle(), None);
        assert_eq!(rig.engine.session().unwrap().page_index(), 3);
    }

    #[test]
    fn test_first_open_adopts_remote_record_id() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let remote_id = Uuid::new_v4();
        rig.mirror.insert_raw(RemoteMirrorEntry {
            record_id: remote_id,
            page_index: 11,
            modification_date: minutes_ago(2),
            short_path: "a.pdf".to_string(),
            device: "phone".to_string(),
        });

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(rig.settle().map(|p| p.page_index), Some(11));
        let record = rig.engine.close().unwrap();
        rig.settle();

        assert_eq!(record.record_id, remote_id);
        assert_eq!(rig.mirror.len(), 1);
    }

    #[test]
    fn test_close_deletes_remote_duplicates() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        for minutes in [30, 40] {
            rig.mirror.insert_raw(RemoteMirrorEntry {
                record_id: Uuid::new_v4(),
                page_index: 1,
                modification_date: minutes_ago(minutes),
                short_path: "a.pdf".to_string(),
                device: "old phone".to_string(),
            });
        }
        assert_eq!(rig.mirror.len(), 3);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        rig.settle();
        rig.engine.close().unwrap();
        rig.settle();

        assert_eq!(rig.mirror.len(), 1);
        assert!(rig.mirror.get(&local.record_id).is_some());
    }

    #[test]
    fn test_renamed_document_mirror_entry_follows_new_name() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        remote_ahead(&mut rig, &local, 9);

        let moved = PathBuf::from("/library/renamed.pdf");
        rig.engine.resolver().rename(&path, &moved);
        rig.engine.open(&moved, DeviceOrientation::Portrait).unwrap();

        // Refreshing the stale token bumps the local date past the remote one.
        assert_eq!(rig.settle(), None);
        let record = rig.engine.close().unwrap();
        rig.settle();

        assert_eq!(record.record_id, local.record_id);
        assert_eq!(rig.mirror.len(), 1);
        assert_eq!(
            rig.mirror.get(&local.record_id).unwrap().short_path,
            "renamed.pdf"
        );
    }

    #[test]
    fn test_transient_lookup_failure_skips_push() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        rig.mirror.set_simulate_transient_error(true);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        assert_eq!(rig.settle(), None);
        rig.mirror.set_simulate_transient_error(false);
        let record = rig.engine.close().unwrap();

        assert_eq!(rig.dispatcher.pending(), 0);
        assert!(rig.mirror.get(&record.record_id).is_none());
        assert_eq!(rig.engine.store().find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_save_is_not_fatal() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        rig.settle();
        rig.mirror.set_simulate_transient_error(true);

        rig.engine.close().unwrap();
        rig.settle();

        assert!(!rig.engine.is_poisoned());
        assert!(rig.mirror.is_empty());
        assert_eq!(rig.engine.store().find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_late_fetch_after_close_changes_nothing() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        remote_ahead(&mut rig, &local, 7);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        let written = rig.engine.close().unwrap();

        // Lookup and push both complete after close, lookup first.
        assert_eq!(rig.settle(), None);
        assert!(rig.engine.pending_prompt().is_none());
        assert_eq!(
            rig.engine.store().get(&local.record_id).unwrap(),
            written
        );
        assert_eq!(rig.engine.phase(), Phase::Persisted);
    }

    #[test]
    fn test_save_completing_before_stale_fetch() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();
        remote_ahead(&mut rig, &local, 7);

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        let written = rig.engine.close().unwrap();

        assert!(rig.dispatcher.run_last());
        assert!(rig.dispatcher.run_next());
        assert_eq!(rig.engine.process_remote_events(), None);

        assert_eq!(rig.mirror.get(&local.record_id).unwrap().page_index, 3);
        assert_eq!(rig.engine.store().find_all().unwrap(), vec![written]);
    }

    #[test]
    fn test_fetch_from_previous_session_is_ignored_in_next() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let local = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();

        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();
        rig.engine.close().unwrap();
        remote_ahead(&mut rig, &local, 40);
        rig.engine.open(&path, DeviceOrientation::Portrait).unwrap();

        // The first session's lookup runs now and sees the page-40 entry, but is stale.
        rig.dispatcher.run_next();
        assert_eq!(rig.engine.process_remote_events(), None);
        assert_eq!(rig.engine.phase(), Phase::RemoteChecking);
    }

    #[test]
    fn test_forget_removes_local_and_remote() {
        let mut rig = with_mirror();
        let path = rig.engine.resolver().add_file("a.pdf");
        let record = read_and_close(&mut rig.engine, &path, 3);
        rig.settle();

        let forgotten = rig.engine.forget(&path).unwrap().unwrap();
        rig.settle();

        assert_eq!(forgotten.record_id, record.record_id);
        assert!(rig.engine.store().find_all().unwrap().is_empty());
        assert!(rig.mirror.is_empty());
        assert_eq!(rig.engine.forget(&path).unwrap(), None);
    }

    #[test]
    fn test_forget_open_document_is_refused() {
        let mut engine = local_only();
        let path = engine.resolver().add_file("a.pdf");
        read_and_close(&mut engine, &path, 1);
        engine.open(&path, DeviceOrientation::Portrait).unwrap();

        assert!(matches!(
            engine.forget(&path),
            Err(FolioError::DocumentAlreadyOpen(_))
        ));
    }
}
