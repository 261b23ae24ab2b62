//! One complete reading session: open, reconcile, move, close.
//!
//! A terminal has no live renderer, so the request describes where the reader
//! ended up and [`HeadlessView`] stands in for the page view.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::model::{DeviceOrientation, Point};
use crate::reconcile::Reconciler;
use crate::session::NavigationTarget;
use crate::store::LocalStore;
use std::path::Path;
use std::time::Duration;

/// What to do when another device has a newer position on a different page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemoteChoice {
    /// Report the offer and keep the local page.
    #[default]
    Ask,
    Accept,
    Keep,
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    /// Page to finish on, in document order.
    pub page: Option<usize>,
    pub offset: Option<Point>,
    pub zoom: Option<f64>,
    pub orientation: DeviceOrientation,
    pub remote: RemoteChoice,
    /// How long to wait for the mirror before and after the session.
    pub settle: Duration,
}

/// Page view without a screen. Remembers where it was sent.
#[derive(Debug, Default)]
pub struct HeadlessView {
    pub page_count: usize,
    pub page: Option<usize>,
    pub offset: Option<Point>,
    pub scale: Option<f64>,
}

impl NavigationTarget for HeadlessView {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn go_to_page(&mut self, display_index: usize) {
        self.page = Some(display_index);
    }

    fn restore_offset(&mut self, offset: Point) {
        self.offset = Some(offset);
    }

    fn restore_scale(&mut self, scale: f64) {
        self.scale = Some(scale);
    }
}

pub fn run<S: LocalStore, R: IdentityResolver>(
    engine: &mut Reconciler<S, R>,
    location: &Path,
    request: ReadRequest,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let mut view = HeadlessView::default();

    let session = engine.open(location, request.orientation)?;
    session.restore_into(&mut view);
    let opened_at = session.page_index();
    let canonical = engine
        .current_location()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| location.to_path_buf());
    result.add_message(CmdMessage::info(format!("Opened at page {}", opened_at + 1)));

    if let Some(prompt) = engine.flush_remote(request.settle) {
        match request.remote {
            RemoteChoice::Accept => {
                engine.accept_remote_page(&mut view)?;
                result.add_message(CmdMessage::success(format!(
                    "Moved to page {} from {}",
                    prompt.page_index + 1,
                    prompt.device
                )));
            }
            RemoteChoice::Keep => {
                engine.decline_remote_page()?;
            }
            RemoteChoice::Ask => {
                engine.decline_remote_page()?;
                result.add_message(CmdMessage::warning(format!(
                    "{} is on page {} (rerun with --accept-remote to move there)",
                    prompt.device,
                    prompt.page_index + 1
                )));
            }
        }
        result.prompt = Some(prompt);
    }

    if let Some(session) = engine.session_mut() {
        if let Some(page) = request.page {
            session.go_to_page(page);
        }
        if let Some(offset) = request.offset {
            session.report_offset(offset);
        }
        if let Some(zoom) = request.zoom {
            session.report_scale(zoom);
        }
    }

    let record = engine.close()?;
    engine.flush_remote(request.settle);

    result.add_message(CmdMessage::success(format!(
        "Saved page {}",
        record.page_index + 1
    )));
    Ok(result.with_record(record, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{engine, TestEngine};
    use crate::model::{ReadingStateRecord, RemoteMirrorEntry, ScrollAxis};
    use crate::remote::memory::MemMirror;
    use crate::remote::ThreadDispatcher;
    use crate::test_utils::minutes_ago;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn settled(page: Option<usize>) -> ReadRequest {
        ReadRequest {
            page,
            settle: Duration::from_secs(5),
            ..ReadRequest::default()
        }
    }

    #[test]
    fn first_read_creates_record() {
        let mut engine = engine();
        let path = engine.resolver().add_file("a.pdf");

        let result = run(&mut engine, &path, settled(Some(4))).unwrap();

        let record = result.record.unwrap();
        assert_eq!(record.page_index, 4);
        assert_eq!(engine.store().find_all().unwrap(), vec![record]);
    }

    #[test]
    fn zoom_and_offset_land_in_current_orientation() {
        let mut engine = engine();
        let path = engine.resolver().add_file("a.pdf");
        let request = ReadRequest {
            offset: Some(Point::new(10.0, 20.0)),
            zoom: Some(1.5),
            orientation: DeviceOrientation::Landscape,
            ..settled(None)
        };

        let record: ReadingStateRecord = run(&mut engine, &path, request).unwrap().record.unwrap();

        assert_eq!(record.offsets.landscape, Point::new(10.0, 20.0));
        assert_eq!(record.offsets.portrait, Point::default());
        assert_eq!(
            record
                .scale_factors
                .get(ScrollAxis::Vertical, DeviceOrientation::Landscape),
            1.5
        );
    }

    fn with_newer_remote(page: usize) -> (TestEngine, MemMirror, PathBuf) {
        let mirror = MemMirror::new();
        let engine = engine().with_remote(Arc::new(mirror.clone()), Box::new(ThreadDispatcher));
        let path = engine.resolver().add_file("a.pdf");
        mirror.insert_raw(RemoteMirrorEntry {
            record_id: uuid::Uuid::new_v4(),
            page_index: page,
            modification_date: minutes_ago(1),
            short_path: "a.pdf".to_string(),
            device: "phone".to_string(),
        });
        (engine, mirror, path)
    }

    #[test]
    fn remote_offer_is_reported_but_not_taken_by_default() {
        let (mut engine, _mirror, path) = with_newer_remote(8);

        let result = run(&mut engine, &path, settled(None)).unwrap();

        assert_eq!(result.prompt.map(|p| p.page_index), Some(8));
        assert_eq!(result.record.unwrap().page_index, 0);
    }

    #[test]
    fn remote_offer_accepted() {
        let (mut engine, mirror, path) = with_newer_remote(8);
        let request = ReadRequest {
            remote: RemoteChoice::Accept,
            ..settled(None)
        };

        let record = run(&mut engine, &path, request).unwrap().record.unwrap();

        assert_eq!(record.page_index, 8);
        assert_eq!(mirror.get(&record.record_id).unwrap().page_index, 8);
        assert_eq!(mirror.len(), 1);
    }
}
