use super::{slash_path, FileKey, IdentityResolver, IdentityToken, Resolution};
use crate::error::{FolioError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolves tokens against real files inside a library root.
///
/// Moved files are only found again if they stay somewhere under `root`.
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn canonical_root(&self) -> PathBuf {
        fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone())
    }

    fn key_at(path: &Path) -> Option<FileKey> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(FileKey::from_metadata(&meta))
    }

    /// Depth-first search for the file carrying `key`. Symlinks are not followed.
    fn find_by_key(&self, dir: &Path, key: FileKey) -> io::Result<Option<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                let meta = entry.metadata()?;
                if FileKey::from_metadata(&meta) == key {
                    return Ok(Some(path));
                }
            }
        }

        for sub in subdirs {
            if let Some(found) = self.find_by_key(&sub, key)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl IdentityResolver for FsResolver {
    fn resolve(&self, token: &IdentityToken) -> Result<Resolution> {
        let last = token.last_known_path();
        if Self::key_at(last) == Some(token.key()) {
            let location = fs::canonicalize(last).map_err(FolioError::Io)?;
            return Ok(Resolution {
                location,
                is_stale: false,
            });
        }

        let root = self.canonical_root();
        match self.find_by_key(&root, token.key()).map_err(FolioError::Io)? {
            Some(found) => {
                log::debug!("{} moved to {}", last.display(), found.display());
                Ok(Resolution {
                    location: found,
                    is_stale: true,
                })
            }
            // Replaced in place (write temp file, rename over): same path, new key.
            None if Self::key_at(last).is_some() => {
                log::debug!("{} was replaced in place", last.display());
                let location = fs::canonicalize(last).map_err(FolioError::Io)?;
                Ok(Resolution {
                    location,
                    is_stale: true,
                })
            }
            None => Err(FolioError::UnresolvableIdentity(last.to_path_buf())),
        }
    }

    fn create_token(&self, location: &Path) -> Result<IdentityToken> {
        let fail = |reason: String| FolioError::IdentityCreationFailed {
            path: location.to_path_buf(),
            reason,
        };

        let canonical = fs::canonicalize(location).map_err(|e| fail(e.to_string()))?;
        let meta = fs::metadata(&canonical).map_err(|e| fail(e.to_string()))?;
        if !meta.is_file() {
            return Err(fail("not a regular file".to_string()));
        }
        Ok(IdentityToken::new(FileKey::from_metadata(&meta), canonical))
    }

    fn short_key(&self, location: &Path) -> String {
        let root = self.canonical_root();
        match location.strip_prefix(&root) {
            Ok(relative) => slash_path(relative),
            Err(_) => location
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| location.to_string_lossy().into_owned()),
        }
    }
}
