use std::collections::HashSet;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{FolioError, Result};
use crate::identity::IdentityResolver;
use crate::model::ReadingStateRecord;
use crate::store::LocalStore;

/// Report from a library sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Records whose document no longer exists.
    pub purged: usize,
    /// Records whose token was re-minted after a rename or move.
    pub refreshed: usize,
    /// Older records that pointed at a document another record already covers.
    pub collapsed: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.purged == 0 && self.refreshed == 0 && self.collapsed == 0
    }
}

/// A record together with where its document lives right now.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntry {
    pub record: ReadingStateRecord,
    pub location: PathBuf,
}

#[derive(Debug, Default)]
pub struct Sweep {
    /// Surviving records, most recently modified first.
    pub entries: Vec<LibraryEntry>,
    pub report: SweepReport,
    pub collapsed_ids: Vec<Uuid>,
}

/// Resolves every record and repairs the store in place:
///
/// 1. **Purge**: token no longer resolves → delete the record.
/// 2. **Collapse**: a newer record already resolves to the same file → delete this one.
/// 3. **Refresh**: token resolved but stale → re-mint it and update the record.
pub fn sweep<S: LocalStore, R: IdentityResolver>(store: &mut S, resolver: &R) -> Result<Sweep> {
    let mut result = Sweep::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    // Newest first, so the first record seen for a location is the keeper.
    for mut record in store.find_all()? {
        let resolution = match resolver.resolve(&record.identity_token) {
            Ok(resolution) => resolution,
            Err(FolioError::UnresolvableIdentity(path)) => {
                log::info!(
                    "purging record {} for missing {}",
                    record.record_id,
                    path.display()
                );
                store.delete(&record.record_id)?;
                result.report.purged += 1;
                continue;
            }
            Err(e) => {
                log::warn!("could not resolve record {}: {}", record.record_id, e);
                continue;
            }
        };

        if seen.contains(&resolution.location) {
            log::info!(
                "collapsing duplicate record {} for {}",
                record.record_id,
                resolution.location.display()
            );
            store.delete(&record.record_id)?;
            result.report.collapsed += 1;
            result.collapsed_ids.push(record.record_id);
            continue;
        }

        if resolution.is_stale {
            match resolver.create_token(&resolution.location) {
                Ok(token) => {
                    record.identity_token = token;
                    record.touch();
                    store.update(&record)?;
                    result.report.refreshed += 1;
                }
                // Keep the old token; it still resolves and the refresh is retried next sweep.
                Err(e) => log::warn!("could not refresh token for {}: {}", record.record_id, e),
            }
        }

        seen.insert(resolution.location.clone());
        result.entries.push(LibraryEntry {
            record,
            location: resolution.location,
        });
    }

    result
        .entries
        .sort_by(|a, b| b.record.modification_date.cmp(&a.record.modification_date));
    Ok(result)
}
