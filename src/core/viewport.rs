//! Viewport state machine: pan, wheel-zoom-at-cursor and inertial coasting.
//!
//! The controller is the single owner of center/zoom. Pointer handlers only
//! record state here; geographic commits happen once per frame when the
//! engine calls [`ViewportController::commit_pending`], so any number of
//! pointer-move events between two frames collapse into one update.

use crate::core::config::EngineOptions;
use crate::core::geo::{LatLng, Point};
use crate::core::project;

/// Nominal frame tick used to normalize pointer velocity, in milliseconds.
const VELOCITY_TICK_MS: f64 = 16.0;

/// Pointer interaction phase. `Idle` is the start and rest state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerPhase {
    Idle,
    Dragging(DragAnchor),
    Animating,
}

/// Snapshot taken at drag start: pointer origin plus the center at that
/// moment. Drag deltas are always measured against the anchor, never
/// accumulated incrementally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub origin: Point,
    pub center: LatLng,
}

/// Manages the current view of the map: center, zoom and screen size.
#[derive(Debug, Clone)]
pub struct ViewportController {
    center: LatLng,
    zoom: f64,
    size: Point,

    phase: PointerPhase,
    /// Coasting/drag velocity in pixels per nominal 16 ms tick.
    velocity: Point,
    last_pointer: Point,
    last_move_ms: f64,
    /// Drag target waiting for the next frame commit.
    pending_center: Option<LatLng>,

    min_zoom: f64,
    max_zoom: f64,
    wheel_zoom_step: f64,
    friction: f64,
    coast_min_speed: f64,
    rest_velocity: f64,
}

impl ViewportController {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            center: options.center.normalized(),
            zoom: options.zoom.clamp(options.min_zoom, options.max_zoom),
            size: options.size,
            phase: PointerPhase::Idle,
            velocity: Point::default(),
            last_pointer: Point::default(),
            last_move_ms: 0.0,
            pending_center: None,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            wheel_zoom_step: options.wheel_zoom_step,
            friction: options.friction,
            coast_min_speed: options.coast_min_speed,
            rest_velocity: options.rest_velocity,
        }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, PointerPhase::Dragging(_))
    }

    pub fn is_animating(&self) -> bool {
        self.phase == PointerPhase::Animating
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Host-driven recenter (e.g. jumping to a device); clamps and wraps.
    pub fn set_center(&mut self, center: LatLng) {
        self.center = center.normalized();
    }

    /// Host-driven zoom; clamps to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Programmatic zoom stepping (the +/- buttons), one level at a time.
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + 1.0);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - 1.0);
    }

    /// Pointer pressed on the map (outside annotation mode). Cancels any
    /// running coast and arms a drag anchored at the pointer.
    pub fn pointer_down(&mut self, position: Point, at_ms: f64) {
        self.velocity = Point::default();
        self.phase = PointerPhase::Dragging(DragAnchor {
            origin: position,
            center: self.center,
        });
        self.last_pointer = position;
        self.last_move_ms = at_ms;
    }

    /// Pointer moved while dragging. Records a fresh velocity sample from
    /// the latest movement and stages the new center for the next frame
    /// commit. Returns true when a commit is pending.
    pub fn pointer_move(&mut self, position: Point, at_ms: f64) -> bool {
        let PointerPhase::Dragging(anchor) = self.phase else {
            return false;
        };

        let dt = at_ms - self.last_move_ms;
        if dt > 0.0 {
            // px per nominal 16 ms tick, from the last movement only
            self.velocity = position
                .subtract(&self.last_pointer)
                .multiply(VELOCITY_TICK_MS / dt);
        }
        self.last_pointer = position;
        self.last_move_ms = at_ms;

        let delta = position.subtract(&anchor.origin);
        let geo = project::pixel_delta_to_geo(&delta, self.zoom);
        self.pending_center = Some(
            LatLng::new(anchor.center.lat + geo.lat, anchor.center.lng + geo.lng).normalized(),
        );

        true
    }

    /// Applies the staged drag target, at most once per frame. Returns true
    /// when the center actually changed.
    pub fn commit_pending(&mut self) -> bool {
        match self.pending_center.take() {
            Some(center) if center != self.center => {
                self.center = center;
                true
            }
            _ => false,
        }
    }

    /// Pointer released: either come to rest or start coasting, depending on
    /// the release speed.
    pub fn pointer_up(&mut self) {
        if !self.is_dragging() {
            return;
        }

        self.phase = if self.velocity.magnitude() < self.coast_min_speed {
            PointerPhase::Idle
        } else {
            PointerPhase::Animating
        };
    }

    /// One coasting step. Decays velocity, applies the remaining motion and
    /// stops once both components fall below the rest threshold. Returns
    /// true while the center is still moving.
    pub fn animate_tick(&mut self) -> bool {
        if self.phase != PointerPhase::Animating {
            return false;
        }

        self.velocity = self.velocity.multiply(self.friction);

        if self.velocity.x.abs() < self.rest_velocity && self.velocity.y.abs() < self.rest_velocity
        {
            self.phase = PointerPhase::Idle;
            self.velocity = Point::default();
            return false;
        }

        let geo = project::pixel_delta_to_geo(&self.velocity, self.zoom);
        self.center =
            LatLng::new(self.center.lat + geo.lat, self.center.lng + geo.lng).normalized();

        true
    }

    /// Wheel zoom anchored at the pointer: the geographic point under the
    /// cursor stays under the cursor. Returns true when the zoom changed.
    pub fn wheel(&mut self, pointer: &Point, scroll_delta_y: f64) -> bool {
        let step = if scroll_delta_y > 0.0 {
            -self.wheel_zoom_step
        } else {
            self.wheel_zoom_step
        };

        let before = self.zoom;
        let after = (before + step).clamp(self.min_zoom, self.max_zoom);
        if after == before {
            return false;
        }

        let under_cursor = project::pixel_to_lon_lat(pointer, before, &self.center, &self.size);
        let reprojected = project::lon_lat_to_pixel(
            under_cursor.lng,
            under_cursor.lat,
            after,
            &self.center,
            &self.size,
        );

        let discrepancy = pointer.subtract(&reprojected);
        let geo = project::pixel_delta_to_geo(&discrepancy, after);

        self.zoom = after;
        self.center =
            LatLng::new(self.center.lat + geo.lat, self.center.lng + geo.lng).normalized();

        true
    }
}
