//! Engine configuration and tuning knobs.
//!
//! Everything that governs interaction feel and resource usage lives here,
//! with defaults matching the production dashboard.

use crate::core::geo::{LatLng, Point};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable options for a [`crate::engine::MapEngine`] instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Initial viewport center.
    pub center: LatLng,
    /// Initial zoom level.
    pub zoom: f64,
    /// Viewport size in logical pixels.
    pub size: Point,

    /// Zoom clamp range.
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom change applied per wheel event.
    pub wheel_zoom_step: f64,

    /// Per-tick velocity decay while coasting.
    pub friction: f64,
    /// Release speed (px/tick) below which no coasting starts.
    pub coast_min_speed: f64,
    /// Per-axis velocity (px/tick) below which coasting stops.
    pub rest_velocity: f64,

    /// Loaded-tile count that triggers an eviction pass.
    pub evict_high: usize,
    /// Number of most recently inserted tiles kept by an eviction pass.
    pub evict_keep: usize,
    /// Maximum new tile fetches issued by a single basemap pass.
    pub fetch_batch: usize,
    /// Per-tile fetch deadline.
    pub fetch_timeout: Duration,

    /// Device pixel ratio is capped here before sizing raster surfaces.
    pub pixel_ratio_cap: f64,
    /// Pointer distance (px) within which a track fix counts as hovered.
    pub hover_tolerance_px: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            center: LatLng::new(-41.472, -72.936),
            zoom: 13.0,
            size: Point::new(800.0, 600.0),
            min_zoom: 1.0,
            max_zoom: 18.0,
            wheel_zoom_step: 0.3,
            friction: 0.92,
            coast_min_speed: 3.0,
            rest_velocity: 0.5,
            evict_high: 150,
            evict_keep: 100,
            fetch_batch: 6,
            fetch_timeout: Duration::from_secs(5),
            pixel_ratio_cap: 2.0,
            hover_tolerance_px: 8.0,
        }
    }
}

impl EngineOptions {
    /// Preset for constrained links: smaller cache, fewer in-flight fetches,
    /// more patience per tile.
    pub fn low_bandwidth() -> Self {
        Self {
            evict_high: 80,
            evict_keep: 50,
            fetch_batch: 3,
            fetch_timeout: Duration::from_secs(10),
            ..Self::default()
        }
    }

    pub fn with_center(mut self, lat: f64, lng: f64) -> Self {
        self.center = LatLng::new(lat, lng);
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Point::new(width, height);
        self
    }
}
