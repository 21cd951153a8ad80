//! Finite-state shape authoring.
//!
//! One explicit state machine owns all in-progress drawing: each tool maps
//! to a state, transitions are driven by pointer events, and the preview
//! vertex that follows the pointer lives in a separate optional field that
//! is dropped on finalize and never persisted.

use crate::annotate::shape::{lat_lng_to_vertex, Shape};
use crate::core::geo::LatLng;

/// The selectable drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Polygon,
    Rectangle,
    Circle,
    Label,
}

/// Authoring state. `Idle` means no tool is active.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    Idle,
    Polygon {
        vertices: Vec<LatLng>,
        preview: Option<LatLng>,
    },
    Rectangle {
        /// Anchor and live corner, set on the first pointer-down.
        corners: Option<(LatLng, LatLng)>,
    },
    Circle {
        /// Center and live edge point, set on the first pointer-down.
        corners: Option<(LatLng, LatLng)>,
    },
    Label,
}

/// Geometry of the in-progress shape, for the overlay pass only.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftShape {
    Polygon {
        vertices: Vec<LatLng>,
        preview: Option<LatLng>,
    },
    Rectangle {
        a: LatLng,
        b: LatLng,
    },
    Circle {
        center: LatLng,
        edge: LatLng,
    },
}

/// Synchronous modal used to collect a shape's title. Returning `None`
/// (cancel) aborts the finalize step; nothing is persisted.
pub trait TitlePrompt {
    fn request_title(&mut self) -> Option<String>;
}

/// Empty titles persist as no title at all.
fn normalize_title(title: String) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The shape-authoring tool.
#[derive(Debug, Default)]
pub struct ShapeTool {
    state: DrawState,
}

impl Default for DrawState {
    fn default() -> Self {
        DrawState::Idle
    }
}

impl ShapeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    /// The active tool, if any.
    pub fn active_kind(&self) -> Option<ToolKind> {
        match self.state {
            DrawState::Idle => None,
            DrawState::Polygon { .. } => Some(ToolKind::Polygon),
            DrawState::Rectangle { .. } => Some(ToolKind::Rectangle),
            DrawState::Circle { .. } => Some(ToolKind::Circle),
            DrawState::Label => Some(ToolKind::Label),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != DrawState::Idle
    }

    /// Select a tool. Selecting the active tool again deactivates it;
    /// switching tools discards any in-progress shape.
    pub fn toggle(&mut self, kind: ToolKind) {
        if self.active_kind() == Some(kind) {
            self.state = DrawState::Idle;
            return;
        }

        self.state = match kind {
            ToolKind::Polygon => DrawState::Polygon {
                vertices: Vec::new(),
                preview: None,
            },
            ToolKind::Rectangle => DrawState::Rectangle { corners: None },
            ToolKind::Circle => DrawState::Circle { corners: None },
            ToolKind::Label => DrawState::Label,
        };
    }

    /// Abandon any in-progress shape and deactivate.
    pub fn cancel(&mut self) {
        self.state = DrawState::Idle;
    }

    /// Pointer pressed at a geographic position. Labels commit immediately;
    /// other tools accumulate geometry.
    pub fn pointer_down(
        &mut self,
        geo: LatLng,
        prompt: &mut dyn TitlePrompt,
    ) -> Option<Shape> {
        match &mut self.state {
            DrawState::Polygon { vertices, preview } => {
                vertices.push(geo);
                *preview = None;
                None
            }
            DrawState::Rectangle { corners } | DrawState::Circle { corners } => {
                *corners = Some((geo, geo));
                None
            }
            DrawState::Label => {
                let title = prompt.request_title();
                self.state = DrawState::Idle;
                let title = title.and_then(normalize_title)?;
                Some(Shape::Label {
                    points: [lat_lng_to_vertex(&geo)],
                    title,
                })
            }
            DrawState::Idle => None,
        }
    }

    /// Pointer moved: updates the preview vertex or the live corner. Never
    /// commits anything.
    pub fn pointer_move(&mut self, geo: LatLng) {
        match &mut self.state {
            DrawState::Polygon { vertices, preview } => {
                if !vertices.is_empty() {
                    *preview = Some(geo);
                }
            }
            DrawState::Rectangle {
                corners: Some((_, live)),
            }
            | DrawState::Circle {
                corners: Some((_, live)),
            } => {
                *live = geo;
            }
            _ => {}
        }
    }

    /// Pointer released: finalizes rectangles and circles. Degenerate drags
    /// (both points equal) are rejected silently; prompt cancellation
    /// discards the shape. Either way the tool deactivates.
    pub fn pointer_up(&mut self, prompt: &mut dyn TitlePrompt) -> Option<Shape> {
        match std::mem::take(&mut self.state) {
            DrawState::Rectangle {
                corners: Some((a, b)),
            } => {
                if a == b {
                    return None;
                }
                let title = prompt.request_title()?;
                Some(Shape::Rectangle {
                    points: [lat_lng_to_vertex(&a), lat_lng_to_vertex(&b)],
                    title: normalize_title(title),
                })
            }
            DrawState::Circle {
                corners: Some((center, edge)),
            } => {
                if center == edge {
                    return None;
                }
                let title = prompt.request_title()?;
                Some(Shape::Circle {
                    points: [lat_lng_to_vertex(&center), lat_lng_to_vertex(&edge)],
                    title: normalize_title(title),
                })
            }
            other => {
                // Releases don't finalize polygons or labels.
                self.state = other;
                None
            }
        }
    }

    /// Double interaction: finalizes a polygon with at least 3 committed
    /// vertices, dropping the preview vertex. Fewer vertices: no shape, and
    /// drawing continues. Prompt cancellation discards the polygon.
    pub fn double_click(&mut self, prompt: &mut dyn TitlePrompt) -> Option<Shape> {
        let DrawState::Polygon { vertices, .. } = &self.state else {
            return None;
        };
        if vertices.len() < 3 {
            return None;
        }

        let DrawState::Polygon { vertices, .. } = std::mem::take(&mut self.state) else {
            unreachable!();
        };

        let title = prompt.request_title()?;
        Some(Shape::Polygon {
            points: vertices.iter().map(lat_lng_to_vertex).collect(),
            title: normalize_title(title),
        })
    }

    /// In-progress geometry for the overlay pass, if any.
    pub fn draft(&self) -> Option<DraftShape> {
        match &self.state {
            DrawState::Polygon { vertices, preview } if !vertices.is_empty() => {
                Some(DraftShape::Polygon {
                    vertices: vertices.clone(),
                    preview: *preview,
                })
            }
            DrawState::Rectangle {
                corners: Some((a, b)),
            } => Some(DraftShape::Rectangle { a: *a, b: *b }),
            DrawState::Circle {
                corners: Some((center, edge)),
            } => Some(DraftShape::Circle {
                center: *center,
                edge: *edge,
            }),
            _ => None,
        }
    }
}
