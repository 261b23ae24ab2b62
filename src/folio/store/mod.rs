//! # Local Reading-State Store
//!
//! The local store is the authority for what the reader sees first. It holds
//! one [`ReadingStateRecord`] per document and is only ever mutated from the
//! reconciliation context, so it needs no locking.
//!
//! ## Layers
//!
//! - [`LocalStore`]: the CRUD contract the rest of folio talks to.
//! - [`record_store::RecordStore`]: implements `LocalStore` on top of any
//!   [`backend::StorageBackend`], enforcing id uniqueness and ordering.
//! - Backends handle the raw I/O:
//!   - [`fs_backend::FsBackend`]: `records.json` in the data directory.
//!   - [`mem_backend::MemBackend`]: in-memory, for tests.
//!
//! ## Commit Semantics
//!
//! Every mutation ends with a single `commit` of the full record set. Backends
//! must make that commit atomic (write to a temp file, then rename), so a crash
//! leaves either the old or the new set on disk, never a mix.
//!
//! A failed commit is reported as [`FolioError::LocalCommitFailed`]. It is not
//! retryable: the in-memory view may no longer match disk, and the
//! reconciliation engine refuses further work after seeing one.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── records.json    # { "<record_id>": ReadingStateRecord, ... }
//! └── config.json     # FolioConfig
//! ```
//!
//! [`FolioError::LocalCommitFailed`]: crate::error::FolioError::LocalCommitFailed

use crate::error::Result;
use crate::model::ReadingStateRecord;
use uuid::Uuid;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod record_store;

/// CRUD over reading-state records.
pub trait LocalStore {
    /// All records, most recently modified first.
    fn find_all(&self) -> Result<Vec<ReadingStateRecord>>;

    fn get(&self, id: &Uuid) -> Result<ReadingStateRecord>;

    fn insert(&mut self, record: &ReadingStateRecord) -> Result<()>;

    fn update(&mut self, record: &ReadingStateRecord) -> Result<()>;

    fn delete(&mut self, id: &Uuid) -> Result<()>;
}
