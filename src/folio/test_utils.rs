//! Fixtures shared by the unit tests.

use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;

use crate::identity::{FileKey, IdentityToken};
use crate::model::{Point, ReadingStateRecord};
use crate::session::NavigationTarget;

/// A token for virtual file number `file` last seen at `path`.
pub fn token(file: u64, path: &str) -> IdentityToken {
    IdentityToken::new(FileKey::new(0, file), PathBuf::from(path))
}

pub fn record_for(file: u64, path: &str) -> ReadingStateRecord {
    ReadingStateRecord::new(token(file, path))
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

/// Renderer double that records every call.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub pages: usize,
    pub visited: Vec<usize>,
    pub offsets: Vec<Point>,
    pub scales: Vec<f64>,
}

impl RecordingNavigator {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}

impl NavigationTarget for RecordingNavigator {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn go_to_page(&mut self, display_index: usize) {
        self.visited.push(display_index);
    }

    fn restore_offset(&mut self, offset: Point) {
        self.offsets.push(offset);
    }

    fn restore_scale(&mut self, scale: f64) {
        self.scales.push(scale);
    }
}
