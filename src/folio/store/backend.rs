use crate::error::Result;
use crate::model::ReadingStateRecord;
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Abstract interface for raw record I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while RecordStore handles the "what" (uniqueness, ordering, error mapping).
pub trait StorageBackend {
    /// Load every persisted record, keyed by record id.
    fn load_records(&self) -> Result<HashMap<Uuid, ReadingStateRecord>>;

    /// Replace the persisted set.
    /// MUST be atomic: readers see either the previous set or this one.
    fn commit(&self, records: &HashMap<Uuid, ReadingStateRecord>) -> Result<()>;

    /// Where the records live. Virtual for in-memory backends.
    fn location(&self) -> PathBuf;
}
