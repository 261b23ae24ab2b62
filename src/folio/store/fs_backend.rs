use super::backend::StorageBackend;
use crate::error::{FolioError, Result};
use crate::model::ReadingStateRecord;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const RECORDS_FILE: &str = "records.json";

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn records_path(&self) -> PathBuf {
        self.root.join(RECORDS_FILE)
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(FolioError::Io)?;
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn load_records(&self) -> Result<HashMap<Uuid, ReadingStateRecord>> {
        let data_file = self.records_path();
        if !data_file.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(data_file).map_err(FolioError::Io)?;
        let records: HashMap<Uuid, ReadingStateRecord> =
            serde_json::from_str(&content).map_err(FolioError::Serialization)?;
        Ok(records)
    }

    fn commit(&self, records: &HashMap<Uuid, ReadingStateRecord>) -> Result<()> {
        self.ensure_dir(&self.root)?;

        let content = serde_json::to_string_pretty(records).map_err(FolioError::Serialization)?;

        let tmp_file = self.root.join(format!(".records-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(FolioError::Io)?;
        if let Err(e) = fs::rename(&tmp_file, self.records_path()) {
            let _ = fs::remove_file(&tmp_file);
            return Err(FolioError::Io(e));
        }

        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.records_path()
    }
}
