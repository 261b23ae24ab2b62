use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::reconcile::Reconciler;
use crate::store::LocalStore;
use std::path::Path;
use std::time::Duration;

pub fn run<S: LocalStore, R: IdentityResolver>(
    engine: &mut Reconciler<S, R>,
    location: &Path,
    settle: Duration,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    match engine.forget(location)? {
        Some(record) => {
            engine.flush_remote(settle);
            result.add_message(CmdMessage::success(format!(
                "Forgot reading state for {} (was on page {})",
                location.display(),
                record.page_index + 1
            )));
        }
        None => result.add_message(CmdMessage::info(format!(
            "Nothing stored for {}",
            location.display()
        ))),
    }
    Ok(result)
}
