use chrono::{DateTime, Utc};

use crate::model::RemoteMirrorEntry;

/// A newer reading position from another device, offered to the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePrompt {
    pub page_index: usize,
    pub device: String,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    KeepLocal,
    OfferRemotePage(MergePrompt),
}

/// Decides what a mirror entry means for the open document.
///
/// Depends only on its arguments, so the outcome is the same whichever of the
/// local load or remote fetch happened to finish first. `local_modified` is
/// `None` for a document with no local record yet.
pub fn decide(
    local_modified: Option<DateTime<Utc>>,
    applied_page: usize,
    remote: &RemoteMirrorEntry,
) -> MergeDecision {
    if let Some(local) = local_modified {
        if remote.modification_date <= local {
            return MergeDecision::KeepLocal;
        }
    }
    if remote.page_index == applied_page {
        return MergeDecision::KeepLocal;
    }
    MergeDecision::OfferRemotePage(MergePrompt {
        page_index: remote.page_index,
        device: remote.device.clone(),
        modified_at: remote.modification_date,
    })
}
