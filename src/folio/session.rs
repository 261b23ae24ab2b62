//! # Reading Session
//!
//! While a document is open, [`ReadingSession`] is the live owner of where the
//! reader is and how the view is configured. It is seeded once from the
//! persisted record, fed by the renderer as the reader scrolls and zooms, and
//! snapshotted on close.
//!
//! ## Live Samples vs Stored Slots
//!
//! Offsets are stored per device orientation, scale factors per
//! (scroll axis, device orientation). The renderer only ever reports values for
//! the *current* context, so they are held as live samples and folded into the
//! matching slot later:
//!
//! ```text
//! report_offset(p)         ──▶ live_offset = p
//! set_device_orientation() ──▶ capture(): offsets[old orientation] = live_offset
//!                              then switch orientation, clear live samples
//! current_snapshot()       ──▶ stored slots + live samples in the active slots
//! ```
//!
//! Capturing before every orientation or axis switch guarantees a sample taken
//! in landscape can never land in the portrait slot, and vice versa.
//!
//! ## Collaborators
//!
//! The session talks to the outside through three small capability traits so a
//! test double only implements what it needs:
//!
//! - [`NavigationTarget`]: the renderer (pages, offsets, zoom).
//! - [`PreferenceHost`]: whoever mirrors display toggles (settings UI).
//! - [`SearchHost`]: the find-on-page bar.

use crate::model::{
    DeviceOrientation, Offsets, Point, Preferences, ReadingStateRecord, ScaleFactors,
    ScrollDirection,
};

/// The rendering surface.
pub trait NavigationTarget {
    fn page_count(&self) -> usize;

    /// Navigate to a page in display order.
    fn go_to_page(&mut self, display_index: usize);

    fn restore_offset(&mut self, offset: Point);

    fn restore_scale(&mut self, scale: f64);
}

pub trait PreferenceHost {
    fn preferences_changed(&mut self, preferences: &Preferences);
}

pub trait SearchHost {
    fn find_on_page_changed(&mut self, enabled: bool);
}

/// Maps a document-order page to display order. The mapping is its own inverse.
pub fn display_page_index(page: usize, page_count: usize, right_to_left: bool) -> usize {
    if !right_to_left || page_count == 0 {
        return page;
    }
    let last = page_count - 1;
    last - page.min(last)
}

/// Session values as they would be persisted right now.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub page_index: usize,
    pub preferences: Preferences,
    pub scale_factors: ScaleFactors,
    pub offsets: Offsets,
}

impl SessionSnapshot {
    /// Writes the session-owned fields onto `record`, leaving identity and dates alone.
    pub fn merge_into(&self, record: &mut ReadingStateRecord) {
        record.page_index = self.page_index;
        record.preferences = self.preferences;
        record.scale_factors = self.scale_factors;
        record.offsets = self.offsets;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadingSession {
    page_index: usize,
    preferences: Preferences,
    scale_factors: ScaleFactors,
    offsets: Offsets,
    orientation: DeviceOrientation,
    live_offset: Option<Point>,
    live_scale: Option<f64>,
}

impl ReadingSession {
    pub fn new(orientation: DeviceOrientation) -> Self {
        Self {
            orientation,
            ..Self::default()
        }
    }

    /// Seeds the session from a persisted record.
    pub fn apply(&mut self, record: &ReadingStateRecord) {
        self.page_index = record.page_index;
        self.preferences = record.preferences;
        self.scale_factors = record.scale_factors;
        self.offsets = record.offsets;
        self.live_offset = None;
        self.live_scale = None;
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Page in document order.
    pub fn go_to_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    /// Renderer callback: the reader is now on `display_index`.
    pub fn report_display_page(&mut self, display_index: usize, page_count: usize) {
        let rtl = self.preferences.reads_right_to_left();
        self.page_index = display_page_index(display_index, page_count, rtl);
    }

    pub fn report_offset(&mut self, offset: Point) {
        self.live_offset = Some(offset);
    }

    /// Renderer callback with the effective on-screen scale.
    pub fn report_scale(&mut self, scale: f64) {
        self.live_scale = Some(scale);
    }

    pub fn set_device_orientation(&mut self, orientation: DeviceOrientation) {
        if orientation == self.orientation {
            return;
        }
        self.capture();
        self.orientation = orientation;
    }

    pub fn set_horizontal_scroll(&mut self, horizontal: bool) {
        if horizontal == self.preferences.is_horizontal_scroll {
            return;
        }
        self.capture();
        self.preferences.is_horizontal_scroll = horizontal;
        if !horizontal {
            self.preferences.is_right_to_left = false;
        }
    }

    /// Right-to-left needs the document to allow page reordering; returns false
    /// and changes nothing when it does not.
    pub fn set_scroll_direction(
        &mut self,
        direction: ScrollDirection,
        allows_document_assembly: bool,
    ) -> bool {
        if direction == ScrollDirection::RightToLeft && !allows_document_assembly {
            log::debug!("right-to-left refused: document does not allow assembly");
            return false;
        }
        let mut next = self.preferences;
        next.set_scroll_direction(direction);
        if next.scroll_axis() != self.preferences.scroll_axis() {
            self.capture();
        }
        self.preferences = next;
        true
    }

    pub fn set_two_up(&mut self, two_up: bool) {
        if two_up == self.preferences.prefers_two_up {
            return;
        }
        // The live scale is normalised using the current mode.
        self.capture();
        self.preferences.prefers_two_up = two_up;
    }

    pub fn set_find_on_page(&mut self, enabled: bool) {
        self.preferences.is_find_on_page_enabled = enabled;
    }

    pub fn publish(&self, preferences: &mut dyn PreferenceHost, search: &mut dyn SearchHost) {
        preferences.preferences_changed(&self.preferences);
        search.find_on_page_changed(self.preferences.is_find_on_page_enabled);
    }

    /// Drives the stored state for the current context into the renderer.
    pub fn restore_into(&self, target: &mut dyn NavigationTarget) {
        let count = target.page_count();
        target.go_to_page(display_page_index(
            self.page_index,
            count,
            self.preferences.reads_right_to_left(),
        ));

        let stored = self
            .scale_factors
            .get(self.preferences.scroll_axis(), self.orientation);
        if stored > 0.0 {
            let scale = if self.preferences.prefers_two_up {
                stored / 2.0
            } else {
                stored
            };
            target.restore_scale(scale);
        }

        target.restore_offset(self.offsets.get(self.orientation));
    }

    pub fn current_snapshot(&self) -> SessionSnapshot {
        let mut scale_factors = self.scale_factors;
        let mut offsets = self.offsets;
        self.fold_live(&mut scale_factors, &mut offsets);
        SessionSnapshot {
            page_index: self.page_index,
            preferences: self.preferences,
            scale_factors,
            offsets,
        }
    }

    fn capture(&mut self) {
        let mut scale_factors = self.scale_factors;
        let mut offsets = self.offsets;
        self.fold_live(&mut scale_factors, &mut offsets);
        self.scale_factors = scale_factors;
        self.offsets = offsets;
        self.live_offset = None;
        self.live_scale = None;
    }

    fn fold_live(&self, scale_factors: &mut ScaleFactors, offsets: &mut Offsets) {
        if let Some(offset) = self.live_offset {
            offsets.set(self.orientation, offset);
        }
        if let Some(scale) = self.live_scale {
            let stored = if self.preferences.prefers_two_up {
                scale * 2.0
            } else {
                scale
            };
            scale_factors.set(self.preferences.scroll_axis(), self.orientation, stored);
        }
    }
}
