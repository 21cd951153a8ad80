//! Persisted annotation shapes.
//!
//! Vertices are stored as `[lng, lat]` pairs, matching the flat JSON layout
//! the dashboard has always persisted. Transient drawing state (the preview
//! vertex that follows the pointer) never appears here — see
//! [`crate::annotate::tool`].

use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};

/// A geographic vertex as persisted: `[lng, lat]`.
pub type Vertex = [f64; 2];

/// User-drawn annotation, tagged by kind in the persisted JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Polygon {
        points: Vec<Vertex>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Rectangle {
        /// Two opposite corners; the drawn rectangle is their axis-aligned
        /// bounding box.
        points: [Vertex; 2],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Circle {
        /// Center and an edge point; the radius is their pixel distance at
        /// render time.
        points: [Vertex; 2],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Label {
        points: [Vertex; 1],
        title: String,
    },
}

impl Shape {
    pub fn title(&self) -> Option<&str> {
        match self {
            Shape::Polygon { title, .. }
            | Shape::Rectangle { title, .. }
            | Shape::Circle { title, .. } => title.as_deref(),
            Shape::Label { title, .. } => Some(title),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        match self {
            Shape::Polygon { points, .. } => points,
            Shape::Rectangle { points, .. } | Shape::Circle { points, .. } => points,
            Shape::Label { points, .. } => points,
        }
    }
}

/// Convert a persisted vertex into a geographic coordinate.
pub fn vertex_to_lat_lng(v: &Vertex) -> LatLng {
    LatLng::new(v[1], v[0])
}

/// Convert a geographic coordinate into the persisted vertex layout.
pub fn lat_lng_to_vertex(p: &LatLng) -> Vertex {
    [p.lng, p.lat]
}
