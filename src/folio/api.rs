//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for every
//! folio operation, whatever the UI.
//!
//! It dispatches to `commands/*.rs`, resolves user-supplied paths against the
//! working directory, and returns `Result<CmdResult>`. It holds no business
//! logic and never prints.
//!
//! `FolioApi<S, R>` is generic over the local store and identity resolver:
//! - Production: `FolioApi<RecordStore<FsBackend>, FsResolver>`
//! - Testing: `FolioApi<RecordStore<MemBackend>, MemResolver>`

use crate::commands;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::reconcile::Reconciler;
use crate::store::LocalStore;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::commands::config::ConfigAction;
pub use crate::commands::prefs::PrefsChange;
pub use crate::commands::read::{ReadRequest, RemoteChoice};
pub use crate::commands::{CmdMessage, CmdResult, MessageLevel};

/// How long a short-lived client waits for the mirror by default.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(3);

pub struct FolioApi<S: LocalStore, R: IdentityResolver> {
    engine: Reconciler<S, R>,
    config_dir: PathBuf,
    cwd: PathBuf,
    settle: Duration,
}

impl<S: LocalStore, R: IdentityResolver> FolioApi<S, R> {
    pub fn new(engine: Reconciler<S, R>, config_dir: PathBuf) -> Self {
        Self {
            engine,
            config_dir,
            cwd: PathBuf::from("."),
            settle: DEFAULT_SETTLE,
        }
    }

    /// Relative document paths are taken from here.
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn engine(&self) -> &Reconciler<S, R> {
        &self.engine
    }

    fn absolute(&self, location: &Path) -> PathBuf {
        if location.is_absolute() {
            location.to_path_buf()
        } else {
            self.cwd.join(location)
        }
    }

    pub fn list_documents(&mut self) -> Result<CmdResult> {
        commands::list::run(&mut self.engine)
    }

    pub fn show_document(&mut self, location: &Path) -> Result<CmdResult> {
        let location = self.absolute(location);
        commands::show::run(&mut self.engine, &location)
    }

    pub fn read_document(&mut self, location: &Path, mut request: ReadRequest) -> Result<CmdResult> {
        let location = self.absolute(location);
        request.settle = self.settle;
        commands::read::run(&mut self.engine, &location, request)
    }

    pub fn change_preferences(
        &mut self,
        location: &Path,
        mut change: PrefsChange,
    ) -> Result<CmdResult> {
        let location = self.absolute(location);
        change.settle = self.settle;
        commands::prefs::run(&mut self.engine, &location, change)
    }

    pub fn forget_document(&mut self, location: &Path) -> Result<CmdResult> {
        let location = self.absolute(location);
        commands::forget::run(&mut self.engine, &location, self.settle)
    }

    pub fn doctor(&mut self) -> Result<CmdResult> {
        commands::doctor::run(&mut self.engine, self.settle)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.config_dir, action)
    }
}
