//! # Remote Reading-State Mirror
//!
//! The mirror is a best-effort copy of each record's reading position, shared
//! between devices. It is never authoritative: local state is shown first, and
//! a mirror entry only matters if its `modification_date` is newer.
//!
//! ## Contract
//!
//! - [`RemoteMirror::fetch_by_short_path`]: fast path while the file keeps its
//!   name. May return several entries when stale duplicates exist.
//! - [`RemoteMirror::fetch_by_record_id`]: fallback after a rename.
//!   [`RemoteError::UnknownItem`] means "create it";
//!   [`RemoteError::Transient`] means "try again next cycle, create nothing".
//! - `save`/`delete`: idempotent by `record_id`. Failures are logged by the
//!   caller, never retried, never fatal.
//!
//! ## Execution Model
//!
//! Mirror calls may block on the network, so they never run on the
//! reconciliation context. A [`RemoteLink`] hands each call to a
//! [`Dispatcher`] as a job; the job sends its outcome back over a channel as
//! a [`RemoteEvent`]. Nothing touches local state until the owning context
//! drains the channel, which keeps the store single-writer.
//!
//! ```text
//!  reconciliation context             dispatcher
//!  ───────────────────────            ──────────
//!  link.fetch(ticket, ..)  ──job──▶   mirror.fetch_by_short_path
//!                                     mirror.fetch_by_record_id
//!  link.drain()  ◀──RemoteEvent──     tx.send(Fetched { ticket, .. })
//! ```
//!
//! Fetches carry a [`SessionTicket`] so a result that arrives after its
//! document was closed can be recognised and dropped.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use crate::model::RemoteMirrorEntry;

pub mod dir;
pub mod dispatch;
pub mod memory;

pub use dispatch::{Dispatcher, Job, ManualDispatcher, ThreadDispatcher};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Unknown item: {0}")]
    UnknownItem(Uuid),

    #[error("Remote unavailable: {0}")]
    Transient(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Network-backed store of mirror entries.
pub trait RemoteMirror: Send + Sync {
    /// Entries for a short path, most recently modified first.
    fn fetch_by_short_path(&self, short_path: &str) -> RemoteResult<Vec<RemoteMirrorEntry>>;

    fn fetch_by_record_id(&self, id: &Uuid) -> RemoteResult<RemoteMirrorEntry>;

    fn save(&self, entry: &RemoteMirrorEntry) -> RemoteResult<()>;

    fn delete(&self, id: &Uuid) -> RemoteResult<()>;
}

/// Identifies one open/close cycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTicket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Newest first; anything after the first is a stale duplicate.
    Found(Vec<RemoteMirrorEntry>),
    Absent,
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Fetched {
        ticket: SessionTicket,
        outcome: FetchOutcome,
    },
    Saved {
        record_id: Uuid,
        result: RemoteResult<()>,
    },
    Deleted {
        record_id: Uuid,
        result: RemoteResult<()>,
    },
}

/// Short-path lookup with the by-id fallback folded in.
pub fn lookup(
    mirror: &dyn RemoteMirror,
    short_path: &str,
    fallback_id: Option<Uuid>,
) -> FetchOutcome {
    match mirror.fetch_by_short_path(short_path) {
        Ok(mut entries) if !entries.is_empty() => {
            entries.sort_by(|a, b| b.modification_date.cmp(&a.modification_date));
            return FetchOutcome::Found(entries);
        }
        Ok(_) => {}
        Err(e) => return FetchOutcome::Unavailable(e.to_string()),
    }

    let Some(id) = fallback_id else {
        return FetchOutcome::Absent;
    };
    match mirror.fetch_by_record_id(&id) {
        Ok(entry) => FetchOutcome::Found(vec![entry]),
        Err(RemoteError::UnknownItem(_)) => FetchOutcome::Absent,
        Err(e) => FetchOutcome::Unavailable(e.to_string()),
    }
}

/// Connects the reconciliation context to a mirror through a dispatcher.
pub struct RemoteLink {
    mirror: Arc<dyn RemoteMirror>,
    dispatcher: Box<dyn Dispatcher>,
    tx: Sender<RemoteEvent>,
    rx: Receiver<RemoteEvent>,
    in_flight: usize,
}

impl RemoteLink {
    pub fn new(mirror: Arc<dyn RemoteMirror>, dispatcher: Box<dyn Dispatcher>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            mirror,
            dispatcher,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Jobs dispatched whose events have not been drained yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn fetch(&mut self, ticket: SessionTicket, short_path: String, fallback_id: Option<Uuid>) {
        let mirror = Arc::clone(&self.mirror);
        let tx = self.tx.clone();
        let started = self.dispatcher.dispatch(Box::new(move || {
            let outcome = lookup(mirror.as_ref(), &short_path, fallback_id);
            let _ = tx.send(RemoteEvent::Fetched { ticket, outcome });
        }));
        if !started {
            // The open document still waits on an outcome, so report one now.
            let _ = self.tx.send(RemoteEvent::Fetched {
                ticket,
                outcome: FetchOutcome::Unavailable("remote job did not start".to_string()),
            });
        }
        self.in_flight += 1;
    }

    pub fn save(&mut self, entry: RemoteMirrorEntry) {
        let mirror = Arc::clone(&self.mirror);
        let tx = self.tx.clone();
        let started = self.dispatcher.dispatch(Box::new(move || {
            let result = mirror.save(&entry);
            let _ = tx.send(RemoteEvent::Saved {
                record_id: entry.record_id,
                result,
            });
        }));
        if started {
            self.in_flight += 1;
        }
    }

    pub fn delete(&mut self, record_id: Uuid) {
        let mirror = Arc::clone(&self.mirror);
        let tx = self.tx.clone();
        let started = self.dispatcher.dispatch(Box::new(move || {
            let result = mirror.delete(&record_id);
            let _ = tx.send(RemoteEvent::Deleted { record_id, result });
        }));
        if started {
            self.in_flight += 1;
        }
    }

    /// Completed events, without blocking.
    pub fn drain(&mut self) -> Vec<RemoteEvent> {
        let events: Vec<RemoteEvent> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(events.len());
        events
    }

    /// Blocks until every in-flight job has reported back or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<RemoteEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(event) => {
                    self.in_flight -= 1;
                    events.push(event);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemMirror;
    use super::*;
    use crate::test_utils::minutes_ago;

    fn entry(short_path: &str, page: usize, minutes: i64) -> RemoteMirrorEntry {
        RemoteMirrorEntry {
            record_id: Uuid::new_v4(),
            page_index: page,
            modification_date: minutes_ago(minutes),
            short_path: short_path.to_string(),
            device: "phone".to_string(),
        }
    }

    #[test]
    fn test_lookup_prefers_short_path_newest_first() {
        let mirror = MemMirror::new();
        let older = entry("a.pdf", 1, 20);
        let newer = entry("a.pdf", 2, 5);
        mirror.insert_raw(older.clone());
        mirror.insert_raw(newer.clone());

        match lookup(&mirror, "a.pdf", None) {
            FetchOutcome::Found(entries) => {
                assert_eq!(entries, vec![newer, older]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lookup_falls_back_to_record_id() {
        let mirror = MemMirror::new();
        let renamed = entry("old-name.pdf", 4, 1);
        mirror.insert_raw(renamed.clone());

        let outcome = lookup(&mirror, "new-name.pdf", Some(renamed.record_id));
        assert_eq!(outcome, FetchOutcome::Found(vec![renamed]));
    }

    #[test]
    fn test_lookup_unknown_item_is_absent() {
        let mirror = MemMirror::new();
        let outcome = lookup(&mirror, "a.pdf", Some(Uuid::new_v4()));
        assert_eq!(outcome, FetchOutcome::Absent);
    }

    #[test]
    fn test_lookup_transient_failure_is_unavailable() {
        let mirror = MemMirror::new();
        mirror.set_simulate_transient_error(true);
        assert!(matches!(
            lookup(&mirror, "a.pdf", Some(Uuid::new_v4())),
            FetchOutcome::Unavailable(_)
        ));
    }

    #[test]
    fn test_link_events_arrive_only_after_jobs_run() {
        let mirror = MemMirror::new();
        let dispatcher = ManualDispatcher::new();
        let mut link = RemoteLink::new(Arc::new(mirror.clone()), Box::new(dispatcher.clone()));

        link.fetch(SessionTicket(1), "a.pdf".to_string(), None);
        assert_eq!(link.in_flight(), 1);
        assert!(link.drain().is_empty());

        dispatcher.run_all();
        let events = link.drain();
        assert_eq!(
            events,
            vec![RemoteEvent::Fetched {
                ticket: SessionTicket(1),
                outcome: FetchOutcome::Absent,
            }]
        );
        assert_eq!(link.in_flight(), 0);
    }

    /// Never starts a job.
    struct StalledDispatcher;

    impl Dispatcher for StalledDispatcher {
        fn dispatch(&self, _job: Job) -> bool {
            false
        }
    }

    #[test]
    fn test_unstarted_jobs_do_not_hold_up_wait() {
        let mut link = RemoteLink::new(Arc::new(MemMirror::new()), Box::new(StalledDispatcher));

        link.save(entry("a.pdf", 3, 0));
        link.delete(Uuid::new_v4());
        assert_eq!(link.in_flight(), 0);

        link.fetch(SessionTicket(4), "a.pdf".to_string(), None);
        let started = Instant::now();
        let events = link.wait(Duration::from_secs(30));

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            events.as_slice(),
            [RemoteEvent::Fetched {
                ticket: SessionTicket(4),
                outcome: FetchOutcome::Unavailable(_),
            }]
        ));
        assert_eq!(link.in_flight(), 0);
    }

    #[test]
    fn test_link_wait_with_threads() {
        let mirror = MemMirror::new();
        let mut link = RemoteLink::new(Arc::new(mirror.clone()), Box::new(ThreadDispatcher));

        let e = entry("a.pdf", 9, 0);
        link.save(e.clone());
        let events = link.wait(Duration::from_secs(5));

        assert_eq!(events.len(), 1);
        assert_eq!(mirror.get(&e.record_id), Some(e));
    }
}
