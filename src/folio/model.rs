//! # Domain Model: Reading State
//!
//! This module defines what folio persists about a document: the
//! [`ReadingStateRecord`] kept in the local store, and the smaller
//! [`RemoteMirrorEntry`] pushed to the shared mirror for cross-device continuity.
//!
//! ## Record Shape
//!
//! ```text
//! ReadingStateRecord
//! ├── record_id            UUID, join key between local and remote
//! ├── identity_token       durable file reference (see identity.rs)
//! ├── page_index           zero-based, document order
//! ├── preferences          four display toggles (flattened in JSON)
//! ├── scale_factors        vertical/horizontal × portrait/landscape
//! ├── offsets              portrait/landscape scroll positions
//! └── creation_date, modification_date
//! ```
//!
//! `modification_date` is the only authority used for conflict resolution, so
//! every persisted mutation goes through [`ReadingStateRecord::touch`].
//!
//! ## Page Order
//!
//! `page_index` is always stored in document order. Right-to-left reading
//! flips the index only at the display boundary (see
//! [`crate::session::display_page_index`]), which keeps records written on
//! different devices with different direction settings comparable.
//!
//! ## Scale Factors
//!
//! A scale of `0.0` means the reader never zoomed and the renderer should fit
//! to size. Stored scales are in single-page units; two-up display halves them
//! when restoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::IdentityToken;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScrollAxis {
    #[default]
    Vertical,
    Horizontal,
}

/// One zoom level per device orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaleFactor {
    pub portrait: f64,
    pub landscape: f64,
}

impl ScaleFactor {
    pub fn get(&self, orientation: DeviceOrientation) -> f64 {
        match orientation {
            DeviceOrientation::Portrait => self.portrait,
            DeviceOrientation::Landscape => self.landscape,
        }
    }

    pub fn set(&mut self, orientation: DeviceOrientation, value: f64) {
        match orientation {
            DeviceOrientation::Portrait => self.portrait = value,
            DeviceOrientation::Landscape => self.landscape = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub vertical: ScaleFactor,
    pub horizontal: ScaleFactor,
}

impl ScaleFactors {
    pub fn for_axis(&self, axis: ScrollAxis) -> &ScaleFactor {
        match axis {
            ScrollAxis::Vertical => &self.vertical,
            ScrollAxis::Horizontal => &self.horizontal,
        }
    }

    pub fn for_axis_mut(&mut self, axis: ScrollAxis) -> &mut ScaleFactor {
        match axis {
            ScrollAxis::Vertical => &mut self.vertical,
            ScrollAxis::Horizontal => &mut self.horizontal,
        }
    }

    pub fn get(&self, axis: ScrollAxis, orientation: DeviceOrientation) -> f64 {
        self.for_axis(axis).get(orientation)
    }

    pub fn set(&mut self, axis: ScrollAxis, orientation: DeviceOrientation, value: f64) {
        self.for_axis_mut(axis).set(orientation, value);
    }
}

/// Last scroll position per device orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offsets {
    pub portrait: Point,
    pub landscape: Point,
}

impl Offsets {
    pub fn get(&self, orientation: DeviceOrientation) -> Point {
        match orientation {
            DeviceOrientation::Portrait => self.portrait,
            DeviceOrientation::Landscape => self.landscape,
        }
    }

    pub fn set(&mut self, orientation: DeviceOrientation, point: Point) {
        match orientation {
            DeviceOrientation::Portrait => self.portrait = point,
            DeviceOrientation::Landscape => self.landscape = point,
        }
    }
}

/// The reading-direction choice offered in the settings popover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    #[default]
    Vertical,
    LeftToRight,
    RightToLeft,
}

impl std::str::FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertical" | "down" | "normal" => Ok(Self::Vertical),
            "ltr" | "left-to-right" | "right" => Ok(Self::LeftToRight),
            "rtl" | "right-to-left" | "left" => Ok(Self::RightToLeft),
            other => Err(format!(
                "Unknown direction '{}' (expected vertical, ltr or rtl)",
                other
            )),
        }
    }
}

impl std::fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScrollDirection::Vertical => "vertical",
            ScrollDirection::LeftToRight => "left to right",
            ScrollDirection::RightToLeft => "right to left",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub is_horizontal_scroll: bool,
    pub is_right_to_left: bool,
    pub prefers_two_up: bool,
    pub is_find_on_page_enabled: bool,
}

impl Preferences {
    pub fn scroll_axis(&self) -> ScrollAxis {
        if self.is_horizontal_scroll {
            ScrollAxis::Horizontal
        } else {
            ScrollAxis::Vertical
        }
    }

    pub fn scroll_direction(&self) -> ScrollDirection {
        match (self.is_horizontal_scroll, self.is_right_to_left) {
            (false, _) => ScrollDirection::Vertical,
            (true, false) => ScrollDirection::LeftToRight,
            (true, true) => ScrollDirection::RightToLeft,
        }
    }

    /// Page order is only reversed while scrolling horizontally.
    pub fn reads_right_to_left(&self) -> bool {
        self.scroll_direction() == ScrollDirection::RightToLeft
    }

    pub fn set_scroll_direction(&mut self, direction: ScrollDirection) {
        let (horizontal, rtl) = match direction {
            ScrollDirection::Vertical => (false, false),
            ScrollDirection::LeftToRight => (true, false),
            ScrollDirection::RightToLeft => (true, true),
        };
        self.is_horizontal_scroll = horizontal;
        self.is_right_to_left = rtl;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingStateRecord {
    pub record_id: Uuid,
    pub identity_token: IdentityToken,
    pub page_index: usize,
    #[serde(flatten)]
    pub preferences: Preferences,
    #[serde(default)]
    pub scale_factors: ScaleFactors,
    #[serde(default)]
    pub offsets: Offsets,
    pub creation_date: DateTime<Utc>,
    pub modification_date: DateTime<Utc>,
}

impl ReadingStateRecord {
    pub fn new(identity_token: IdentityToken) -> Self {
        Self::with_id(Uuid::new_v4(), identity_token)
    }

    /// Creates a record under an id that already exists elsewhere (e.g. in the mirror).
    pub fn with_id(record_id: Uuid, identity_token: IdentityToken) -> Self {
        let now = Utc::now();
        Self {
            record_id,
            identity_token,
            page_index: 0,
            preferences: Preferences::default(),
            scale_factors: ScaleFactors::default(),
            offsets: Offsets::default(),
            creation_date: now,
            modification_date: now,
        }
    }

    /// Stamps the record as modified now. Each stamp is strictly later than the last.
    pub fn touch(&mut self) {
        let floor = self.modification_date + chrono::Duration::microseconds(1);
        self.modification_date = Utc::now().max(floor);
    }
}

/// The part of a record shared with other devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMirrorEntry {
    pub record_id: Uuid,
    pub page_index: usize,
    pub modification_date: DateTime<Utc>,
    pub short_path: String,
    pub device: String,
}

impl RemoteMirrorEntry {
    pub fn from_record(record: &ReadingStateRecord, short_path: &str, device: &str) -> Self {
        Self {
            record_id: record.record_id,
            page_index: record.page_index,
            modification_date: record.modification_date,
            short_path: short_path.to_string(),
            device: device.to_string(),
        }
    }
}
