use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::model::{DeviceOrientation, Preferences, ScrollDirection};
use crate::reconcile::Reconciler;
use crate::session::{PreferenceHost, SearchHost};
use crate::store::LocalStore;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct PrefsChange {
    pub direction: Option<ScrollDirection>,
    pub two_up: Option<bool>,
    pub find_on_page: Option<bool>,
    /// Whether the document permits page reordering, which right-to-left needs.
    pub allows_document_assembly: bool,
    pub settle: Duration,
}

impl PrefsChange {
    pub fn is_empty(&self) -> bool {
        self.direction.is_none() && self.two_up.is_none() && self.find_on_page.is_none()
    }
}

/// Collects what the session publishes so it can be reported back.
#[derive(Default)]
struct Published {
    lines: Vec<String>,
}

impl PreferenceHost for Published {
    fn preferences_changed(&mut self, preferences: &Preferences) {
        self.lines.push(format!(
            "direction {}, two-up {}",
            preferences.scroll_direction(),
            on_off(preferences.prefers_two_up)
        ));
    }
}

impl SearchHost for Published {
    fn find_on_page_changed(&mut self, enabled: bool) {
        self.lines.push(format!("find on page {}", on_off(enabled)));
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Changes display preferences for one document and persists them.
pub fn run<S: LocalStore, R: IdentityResolver>(
    engine: &mut Reconciler<S, R>,
    location: &Path,
    change: PrefsChange,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let session = engine.open(location, DeviceOrientation::default())?;

    if let Some(direction) = change.direction {
        if !session.set_scroll_direction(direction, change.allows_document_assembly) {
            result.add_message(CmdMessage::warning(
                "Right-to-left needs a document that allows page reordering; direction unchanged",
            ));
        }
    }
    if let Some(two_up) = change.two_up {
        session.set_two_up(two_up);
    }
    if let Some(enabled) = change.find_on_page {
        session.set_find_on_page(enabled);
    }

    let mut display = Published::default();
    let mut search = Published::default();
    session.publish(&mut display, &mut search);
    for line in display.lines.into_iter().chain(search.lines) {
        result.add_message(CmdMessage::info(line));
    }

    let canonical = engine
        .current_location()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| location.to_path_buf());
    // Preferences never move the page, so a remote offer is left unanswered.
    engine.flush_remote(change.settle);
    let record = engine.close()?;
    engine.flush_remote(change.settle);

    if !change.is_empty() {
        result.add_message(CmdMessage::success("Preferences saved."));
    }
    Ok(result.with_record(record, canonical))
}
