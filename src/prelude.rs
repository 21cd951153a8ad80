//! Prelude module for common trackmap types and traits
//!
//! Re-exports the most commonly used types for easy importing with
//! `use trackmap::prelude::*;`

pub use crate::core::{
    config::EngineOptions,
    geo::{LatLng, Point, TileCoord},
    viewport::{PointerPhase, ViewportController},
};

pub use crate::input::events::{EventManager, MapEvent, PointerEvent};

pub use crate::tiles::{
    cache::{TileSlot, TileStore},
    loader::{TileFetch, TileLoader, TileResult},
    source::{DarkBasemapSource, TileSource},
};

pub use crate::render::{
    basemap::BasemapRenderer,
    context::{Color, DrawCommand, LineStyle, PointStyle, PolygonStyle, RenderContext},
    overlay::OverlayRenderer,
};

pub use crate::track::{DurationClass, PlaybackWindow, TrackPoint, Trajectory};

pub use crate::annotate::{
    shape::Shape,
    store::{MemoryShapeStore, ShapeStore},
    tool::{DrawState, ShapeTool, TitlePrompt, ToolKind},
};

pub use crate::spatial::TrackIndex;

pub use crate::engine::MapEngine;

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
