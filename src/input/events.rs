use crate::core::geo::{LatLng, Point};
use crate::prelude::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Pointer/wheel events fed into the engine by the host.
///
/// Events carry host-supplied millisecond timestamps where velocity math
/// needs them, so interaction dynamics stay deterministic under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Primary button pressed
    Down { position: Point, at_ms: f64 },
    /// Pointer moved (buttons irrelevant; the engine knows the phase)
    Move { position: Point, at_ms: f64 },
    /// Primary button released
    Up,
    /// Double interaction (finalizes polygon drawing)
    DoubleClick { position: Point },
    /// Scroll wheel; positive `delta_y` scrolls away (zoom out)
    Wheel { position: Point, delta_y: f64 },
    /// Pointer left the canvas (treated like a release)
    Leave,
}

impl PointerEvent {
    /// Gets the position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            PointerEvent::Down { position, .. } => Some(*position),
            PointerEvent::Move { position, .. } => Some(*position),
            PointerEvent::DoubleClick { position } => Some(*position),
            PointerEvent::Wheel { position, .. } => Some(*position),
            PointerEvent::Up | PointerEvent::Leave => None,
        }
    }
}

/// Events the engine emits upward for the surrounding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Center or zoom changed (drag commit, coast tick, wheel, buttons)
    ViewChanged { center: LatLng, zoom: f64 },
    /// The hovered trajectory changed (None = nothing under the pointer)
    HoverChanged { id: Option<String> },
    /// The persisted shape list changed (append or removal)
    ShapesChanged { count: usize },
}

impl MapEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MapEvent::ViewChanged { .. } => "viewchanged",
            MapEvent::HoverChanged { .. } => "hoverchanged",
            MapEvent::ShapesChanged { .. } => "shapeschanged",
        }
    }
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Callback registry for engine events.
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event type
    listeners: HashMap<String, Vec<EventCallback>>,
    /// Event queue for processing
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener for `"viewchanged"`, `"hoverchanged"` or
    /// `"shapeschanged"`.
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Queue an event for the next processing pass
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Dispatch all queued events to their listeners and return them
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(event.event_type()) {
                for callback in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}
