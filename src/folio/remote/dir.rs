use super::{RemoteError, RemoteMirror, RemoteResult};
use crate::model::RemoteMirrorEntry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Mirror kept in a folder that a sync service shares between devices.
///
/// Each entry is one `<record_id>.json` file, so concurrent writers on
/// different devices only ever touch their own entries and the sync service
/// never has to merge file contents.
pub struct DirMirror {
    dir: PathBuf,
}

impl DirMirror {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn entry_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_entry(path: &Path) -> io::Result<RemoteMirrorEntry> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn transient(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transient(e.to_string())
}

impl RemoteMirror for DirMirror {
    fn fetch_by_short_path(&self, short_path: &str) -> RemoteResult<Vec<RemoteMirrorEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(transient(e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(transient)?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read_entry(&path) {
                Ok(e) if e.short_path == short_path => found.push(e),
                Ok(_) => {}
                // Half-synced or foreign files are skipped, not fatal.
                Err(e) => log::debug!("skipping {}: {}", path.display(), e),
            }
        }
        found.sort_by(|a, b| b.modification_date.cmp(&a.modification_date));
        Ok(found)
    }

    fn fetch_by_record_id(&self, id: &Uuid) -> RemoteResult<RemoteMirrorEntry> {
        match Self::read_entry(&self.entry_path(id)) {
            Ok(entry) => Ok(entry),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RemoteError::UnknownItem(*id)),
            Err(e) => Err(transient(e)),
        }
    }

    fn save(&self, entry: &RemoteMirrorEntry) -> RemoteResult<()> {
        fs::create_dir_all(&self.dir).map_err(transient)?;

        let target = self.entry_path(&entry.record_id);
        if let Ok(existing) = Self::read_entry(&target) {
            if existing.modification_date > entry.modification_date {
                log::debug!("ignoring stale save for {}", entry.record_id);
                return Ok(());
            }
        }

        let content = serde_json::to_string_pretty(entry).map_err(transient)?;
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content).map_err(transient)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(transient(e));
        }
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> RemoteResult<()> {
        match fs::remove_file(self.entry_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(transient(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::minutes_ago;
    use tempfile::TempDir;

    fn entry(short_path: &str, page: usize, minutes: i64) -> RemoteMirrorEntry {
        RemoteMirrorEntry {
            record_id: Uuid::new_v4(),
            page_index: page,
            modification_date: minutes_ago(minutes),
            short_path: short_path.to_string(),
            device: "laptop".to_string(),
        }
    }

    #[test]
    fn test_missing_dir_is_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().join("not-yet"));
        assert_eq!(mirror.fetch_by_short_path("a.pdf").unwrap(), vec![]);
    }

    #[test]
    fn test_save_then_fetch() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().join("mirror"));
        let e = entry("books/a.pdf", 7, 0);

        mirror.save(&e).unwrap();

        assert_eq!(mirror.fetch_by_record_id(&e.record_id).unwrap(), e);
        assert_eq!(mirror.fetch_by_short_path("books/a.pdf").unwrap(), vec![e]);
        assert!(mirror.fetch_by_short_path("books/b.pdf").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_item() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().to_path_buf());
        let id = Uuid::new_v4();
        assert_eq!(
            mirror.fetch_by_record_id(&id),
            Err(RemoteError::UnknownItem(id))
        );
    }

    #[test]
    fn test_corrupt_entry_is_transient_and_skipped_in_scan() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().to_path_buf());
        let id = Uuid::new_v4();
        fs::write(tmp.path().join(format!("{}.json", id)), "{ not json").unwrap();

        assert!(matches!(
            mirror.fetch_by_record_id(&id),
            Err(RemoteError::Transient(_))
        ));
        assert!(mirror.fetch_by_short_path("a.pdf").unwrap().is_empty());
    }

    #[test]
    fn test_stale_save_keeps_newer_entry() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().to_path_buf());
        let newer = entry("a.pdf", 10, 0);
        let mut older = newer.clone();
        older.page_index = 1;
        older.modification_date = minutes_ago(5);

        mirror.save(&newer).unwrap();
        mirror.save(&older).unwrap();

        assert_eq!(mirror.fetch_by_record_id(&newer.record_id).unwrap().page_index, 10);
    }

    #[test]
    fn test_delete_removes_file_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().to_path_buf());
        let e = entry("a.pdf", 1, 0);
        mirror.save(&e).unwrap();

        mirror.delete(&e.record_id).unwrap();
        mirror.delete(&e.record_id).unwrap();

        assert!(!tmp.path().join(format!("{}.json", e.record_id)).exists());
    }
}
