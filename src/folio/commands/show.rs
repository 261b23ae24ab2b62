use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::reconcile::Reconciler;
use crate::store::LocalStore;
use std::path::Path;

pub fn run<S: LocalStore, R: IdentityResolver>(
    engine: &mut Reconciler<S, R>,
    location: &Path,
) -> Result<CmdResult> {
    match engine.find_document(location)? {
        Some(entry) => Ok(CmdResult::default().with_record(entry.record, entry.location)),
        None => {
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::info(format!(
                "No reading state stored for {}",
                location.display()
            )));
            Ok(result)
        }
    }
}
