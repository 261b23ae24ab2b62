use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::reconcile::Reconciler;
use crate::store::LocalStore;
use std::time::Duration;

pub fn run<S: LocalStore, R: IdentityResolver>(
    engine: &mut Reconciler<S, R>,
    settle: Duration,
) -> Result<CmdResult> {
    let report = engine.sweep()?;
    engine.flush_remote(settle);
    let mut result = CmdResult::default();

    if report.is_clean() {
        result.add_message(CmdMessage::success("No inconsistencies found."));
    } else {
        result.add_message(CmdMessage::warning("Inconsistencies found and fixed:"));
        if report.purged > 0 {
            result.add_message(CmdMessage::info(format!(
                "  - Removed {} record(s) for documents that no longer exist.",
                report.purged
            )));
        }
        if report.refreshed > 0 {
            result.add_message(CmdMessage::info(format!(
                "  - Updated {} record(s) for renamed or moved documents.",
                report.refreshed
            )));
        }
        if report.collapsed > 0 {
            result.add_message(CmdMessage::info(format!(
                "  - Merged {} duplicate record(s).",
                report.collapsed
            )));
        }
    }

    Ok(result.with_report(report))
}
