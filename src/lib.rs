//! # trackmap
//!
//! Tile-based map rendering and annotation engine for radar-track
//! visualization dashboards.
//!
//! The crate owns the interactive map canvas: Web-Mercator projection math,
//! a pointer-driven viewport with inertial coasting, an asynchronous tile
//! fetch/cache pipeline, a dual-layer (basemap + overlay) render pipeline
//! expressed as draw-command queues, time-windowed trajectory playback and a
//! finite-state shape-authoring tool. Data access, the push channel and the
//! surrounding page chrome are the host's problem; they talk to the engine
//! through the interfaces in [`engine`] and [`annotate::store`].

pub mod annotate;
pub mod core;
pub mod engine;
pub mod input;
pub mod prelude;
pub mod render;
pub mod spatial;
pub mod tiles;
pub mod track;

// Re-export public API
pub use crate::core::{
    config::EngineOptions,
    geo::{LatLng, Point, TileCoord},
    viewport::{PointerPhase, ViewportController},
};

pub use crate::tiles::{cache::TileStore, loader::TileLoader, source::TileSource};

pub use crate::input::events::{MapEvent, PointerEvent};

pub use crate::track::{DurationClass, PlaybackWindow, TrackPoint, Trajectory};

pub use crate::annotate::{shape::Shape, store::ShapeStore, tool::ShapeTool};

pub use crate::render::context::{DrawCommand, RenderContext};

pub use crate::engine::MapEngine;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error type alias for convenience
pub type Error = MapError;
