//! # Document Identity
//!
//! A document's path is not a stable key: files get renamed, moved between
//! folders, or deleted behind the reader's back. Records therefore reference
//! documents through an [`IdentityToken`], a durable file reference that keeps
//! resolving after a rename or move within the library container.
//!
//! ## Token Contents
//!
//! - A [`FileKey`] read from file metadata (device + inode on Unix). This is
//!   what survives renames.
//! - The last known path. Resolution checks it first, so the common case of an
//!   untouched file costs one `stat`.
//!
//! ## Resolution Outcomes
//!
//! | Situation                      | Result                                   |
//! |--------------------------------|------------------------------------------|
//! | File still at last known path  | `Resolution { is_stale: false }`         |
//! | File moved/renamed in library  | `Resolution { is_stale: true }`          |
//! | File gone                      | `Err(FolioError::UnresolvableIdentity)`  |
//!
//! A stale resolution means the caller should mint a fresh token from the new
//! location and update the owning record in place. Resolvers never write to
//! any store themselves.
//!
//! ## Implementations
//!
//! - [`fs::FsResolver`]: real files under a library root.
//! - [`memory::MemResolver`]: a virtual file table for tests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub mod fs;
pub mod memory;

/// Metadata-derived key that identifies a file independent of its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey {
    volume: u64,
    file: u64,
}

impl FileKey {
    pub(crate) fn new(volume: u64, file: u64) -> Self {
        Self { volume, file }
    }

    #[cfg(unix)]
    pub(crate) fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::new(meta.dev(), meta.ino())
    }

    // Without inodes the creation time is the closest stable attribute.
    #[cfg(not(unix))]
    pub(crate) fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let created = meta
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(0, created)
    }
}

/// Durable, rename-resistant reference to a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityToken {
    key: FileKey,
    path: PathBuf,
}

impl IdentityToken {
    pub(crate) fn new(key: FileKey, path: PathBuf) -> Self {
        Self { key, path }
    }

    pub(crate) fn key(&self) -> FileKey {
        self.key
    }

    /// Where the document was when the token was minted.
    pub fn last_known_path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub location: PathBuf,
    pub is_stale: bool,
}

/// Maps documents to durable tokens and back.
pub trait IdentityResolver {
    /// Find where the token's document currently lives.
    fn resolve(&self, token: &IdentityToken) -> Result<Resolution>;

    /// Mint a token for an existing document.
    fn create_token(&self, location: &Path) -> Result<IdentityToken>;

    /// Short, path-derived key used to look the document up in the mirror.
    fn short_key(&self, location: &Path) -> String;
}

/// Joins path components with `/` regardless of platform.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
