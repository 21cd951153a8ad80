//! Trajectory records and time-windowed playback.
//!
//! Trajectories arrive from the data layer already deduplicated and sorted
//! by timestamp; the engine only filters them against the timeline cursor
//! and classifies them by duration for coloring.

use crate::render::context::Color;
use serde::{Deserialize, Serialize};

/// Duration (seconds) at or under which a trajectory counts as short-lived.
pub const SHORT_MAX_SECONDS: f64 = 30.0;
/// Duration (seconds) at or over which a trajectory counts as long-lived.
pub const LONG_MIN_SECONDS: f64 = 120.0;

/// Cursor value meaning "show every point regardless of timestamp".
pub const CURSOR_SHOW_ALL: f64 = 60.0;

/// One radar fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
}

impl TrackPoint {
    pub fn new(lat: f64, lng: f64, alt: f64, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lng,
            alt,
            timestamp_ms,
        }
    }
}

/// One tracked target's time-ordered sequence of fixes, plus the aggregates
/// the data layer derives for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: String,
    pub points: Vec<TrackPoint>,
    pub speed: f64,
    pub confidence: f64,
}

impl Trajectory {
    pub fn new(id: impl Into<String>, points: Vec<TrackPoint>) -> Self {
        Self {
            id: id.into(),
            points,
            speed: 0.0,
            confidence: 0.0,
        }
    }

    /// Span between first and last fix, in seconds. Zero for degenerate
    /// trajectories.
    pub fn duration_seconds(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => {
                (last.timestamp_ms - first.timestamp_ms) as f64 / 1000.0
            }
            _ => 0.0,
        }
    }
}

/// Scrub position within the selected hour.
///
/// The engine never reads wall-clock time: the host supplies the epoch
/// milliseconds of the viewed day's midnight, and the window derives the
/// cursor instant from hour and cursor minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackWindow {
    /// Midnight of the viewed day, epoch milliseconds.
    pub day_start_ms: i64,
    /// Selected hour of that day, 0-23.
    pub hour: u8,
    /// Minutes elapsed within the hour, 0-60; 60 shows everything.
    pub cursor_min: f64,
}

impl PlaybackWindow {
    pub fn new(day_start_ms: i64, hour: u8, cursor_min: f64) -> Self {
        Self {
            day_start_ms,
            hour: hour.min(23),
            cursor_min: cursor_min.clamp(0.0, CURSOR_SHOW_ALL),
        }
    }

    /// Whether the cursor sits at the show-everything sentinel.
    pub fn shows_all(&self) -> bool {
        self.cursor_min >= CURSOR_SHOW_ALL
    }

    /// The instant the cursor points at.
    pub fn cursor_time_ms(&self) -> i64 {
        self.day_start_ms + self.hour as i64 * 3_600_000 + (self.cursor_min * 60_000.0) as i64
    }
}

/// Points revealed by the cursor: everything at or before the cursor
/// instant, or all points at the sentinel. Implemented as a filter over the
/// whole list — sortedness makes the result a prefix but is not assumed.
pub fn visible_points(points: &[TrackPoint], window: &PlaybackWindow) -> Vec<TrackPoint> {
    if window.shows_all() {
        return points.to_vec();
    }

    let cursor_time = window.cursor_time_ms();
    points
        .iter()
        .filter(|p| p.timestamp_ms <= cursor_time)
        .copied()
        .collect()
}

/// Duration class driving trajectory color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationClass {
    Short,
    Medium,
    Long,
}

impl DurationClass {
    /// Classify by full-trajectory duration; boundary values are inclusive
    /// on both ends. Degenerate trajectories default to short.
    pub fn classify(trajectory: &Trajectory) -> Self {
        if trajectory.points.len() < 2 {
            return DurationClass::Short;
        }

        let duration = trajectory.duration_seconds();
        if duration <= SHORT_MAX_SECONDS {
            DurationClass::Short
        } else if duration >= LONG_MIN_SECONDS {
            DurationClass::Long
        } else {
            DurationClass::Medium
        }
    }

    /// Display color for the class.
    pub fn color(&self) -> Color {
        match self {
            DurationClass::Short => Color::rgb(0xFC, 0xD3, 0x4D),
            DurationClass::Medium => Color::rgb(0xF9, 0x73, 0x16),
            DurationClass::Long => Color::rgb(0xEF, 0x44, 0x44),
        }
    }
}
