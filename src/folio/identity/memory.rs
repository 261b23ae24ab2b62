use super::{slash_path, FileKey, IdentityResolver, IdentityToken, Resolution};
use crate::error::{FolioError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory file table for testing identity handling.
///
/// Paths map to file numbers; renaming keeps the number, which is what lets
/// tokens survive the move. Like `MemBackend`, interior mutability lets the
/// resolver be shared by `&self` while tests rearrange files.
pub struct MemResolver {
    root: PathBuf,
    files: RefCell<HashMap<PathBuf, u64>>,
    next_file: Cell<u64>,
    simulate_creation_error: Cell<bool>,
}

impl Default for MemResolver {
    fn default() -> Self {
        Self::new("/library")
    }
}

impl MemResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: RefCell::new(HashMap::new()),
            next_file: Cell::new(1),
            simulate_creation_error: Cell::new(false),
        }
    }

    /// Adds a file under the root and returns its full path.
    pub fn add_file(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        let id = self.next_file.get();
        self.next_file.set(id + 1);
        self.files.borrow_mut().insert(path.clone(), id);
        path
    }

    /// Moves a file, keeping its identity. Returns false if `from` is unknown.
    pub fn rename(&self, from: &Path, to: &Path) -> bool {
        let mut files = self.files.borrow_mut();
        match files.remove(from) {
            Some(id) => {
                files.insert(to.to_path_buf(), id);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files.borrow_mut().remove(path).is_some()
    }

    pub fn set_simulate_creation_error(&self, simulate: bool) {
        self.simulate_creation_error.set(simulate);
    }
}

impl IdentityResolver for MemResolver {
    fn resolve(&self, token: &IdentityToken) -> Result<Resolution> {
        let files = self.files.borrow();
        let wanted = token.key();

        if let Some(id) = files.get(token.last_known_path()) {
            if FileKey::new(0, *id) == wanted {
                return Ok(Resolution {
                    location: token.last_known_path().to_path_buf(),
                    is_stale: false,
                });
            }
        }

        files
            .iter()
            .find(|(_, id)| FileKey::new(0, **id) == wanted)
            .map(|(path, _)| Resolution {
                location: path.clone(),
                is_stale: true,
            })
            .ok_or_else(|| FolioError::UnresolvableIdentity(token.last_known_path().to_path_buf()))
    }

    fn create_token(&self, location: &Path) -> Result<IdentityToken> {
        if self.simulate_creation_error.get() {
            return Err(FolioError::IdentityCreationFailed {
                path: location.to_path_buf(),
                reason: "Simulated creation error".to_string(),
            });
        }
        let files = self.files.borrow();
        let id = files
            .get(location)
            .ok_or_else(|| FolioError::IdentityCreationFailed {
                path: location.to_path_buf(),
                reason: "no such file".to_string(),
            })?;
        Ok(IdentityToken::new(FileKey::new(0, *id), location.to_path_buf()))
    }

    fn short_key(&self, location: &Path) -> String {
        match location.strip_prefix(&self.root) {
            Ok(relative) => slash_path(relative),
            Err(_) => location.to_string_lossy().into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_keeps_identity() {
        let resolver = MemResolver::default();
        let path = resolver.add_file("a.pdf");
        let token = resolver.create_token(&path).unwrap();

        let moved = PathBuf::from("/library/shelf/b.pdf");
        assert!(resolver.rename(&path, &moved));

        let res = resolver.resolve(&token).unwrap();
        assert!(res.is_stale);
        assert_eq!(res.location, moved);
    }

    #[test]
    fn test_replaced_file_is_not_the_same_document() {
        let resolver = MemResolver::default();
        let path = resolver.add_file("a.pdf");
        let token = resolver.create_token(&path).unwrap();

        resolver.remove(&path);
        resolver.add_file("a.pdf");

        assert!(matches!(
            resolver.resolve(&token),
            Err(FolioError::UnresolvableIdentity(_))
        ));
    }

    #[test]
    fn test_simulated_creation_error() {
        let resolver = MemResolver::default();
        let path = resolver.add_file("a.pdf");
        resolver.set_simulate_creation_error(true);

        assert!(matches!(
            resolver.create_token(&path),
            Err(FolioError::IdentityCreationFailed { .. })
        ));
    }

    #[test]
    fn test_short_key() {
        let resolver = MemResolver::default();
        let path = resolver.add_file("books/a.pdf");
        assert_eq!(resolver.short_key(&path), "books/a.pdf");
    }
}
