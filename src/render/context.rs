//! Backend-agnostic rendering context.
//!
//! Both render passes emit [`DrawCommand`]s into a queue; the host's raster
//! backend replays the queue onto its surface. Coordinates are logical
//! pixels — the backend multiplies by [`RenderContext::pixel_ratio`] when
//! sizing its physical surface.

use crate::core::geo::Point;
use crate::tiles::cache::TileImage;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

/// Drop shadow rendered under a stroked path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f64,
    pub offset: Point,
}

/// Style for stroked polylines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    /// Round caps and joins (trajectory paths use these).
    pub rounded: bool,
    pub shadow: Option<Shadow>,
}

/// Style for filled-and-stroked outlines (polygons, rectangles, circles,
/// round markers).
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonStyle {
    pub fill: Option<Color>,
    pub stroke: Color,
    pub stroke_width: f64,
}

/// Style for round point markers.
#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
    pub radius: f64,
}

/// Style for label text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub bold: bool,
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone)]
pub enum DrawCommand {
    FillRect {
        min: Point,
        max: Point,
        color: Color,
    },
    Tile {
        image: TileImage,
        /// Top-left corner in logical pixels; tiles draw at 256x256.
        origin: Point,
    },
    Line {
        points: Vec<Point>,
        style: LineStyle,
    },
    Polygon {
        exterior: Vec<Point>,
        /// Open rings (an in-progress polygon) stroke without closing/filling.
        closed: bool,
        style: PolygonStyle,
    },
    Circle {
        center: Point,
        radius: f64,
        style: PolygonStyle,
    },
    Marker {
        position: Point,
        style: PointStyle,
    },
    Text {
        position: Point,
        content: String,
        style: TextStyle,
    },
}

/// Command-queue render target for one layer.
pub struct RenderContext {
    pub width: f64,
    pub height: f64,
    /// Device pixel ratio after capping, applied by the backend.
    pub pixel_ratio: f64,
    queue: Vec<DrawCommand>,
}

impl RenderContext {
    /// Create a context for a logical size; `device_pixel_ratio` is capped
    /// to keep surface memory bounded on very dense displays.
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64, ratio_cap: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio: device_pixel_ratio.min(ratio_cap).max(1.0),
            queue: Vec::new(),
        }
    }

    /// Begin a frame: the queue starts empty, i.e. the surface is cleared.
    pub fn begin_frame(&mut self) {
        self.queue.clear();
    }

    pub fn fill_rect(&mut self, min: Point, max: Point, color: Color) {
        self.queue.push(DrawCommand::FillRect { min, max, color });
    }

    pub fn draw_tile(&mut self, image: TileImage, origin: Point) {
        self.queue.push(DrawCommand::Tile { image, origin });
    }

    pub fn draw_line(&mut self, points: Vec<Point>, style: LineStyle) {
        if points.len() >= 2 {
            self.queue.push(DrawCommand::Line { points, style });
        }
    }

    pub fn draw_polygon(&mut self, exterior: Vec<Point>, closed: bool, style: PolygonStyle) {
        if exterior.len() >= 2 {
            self.queue.push(DrawCommand::Polygon {
                exterior,
                closed,
                style,
            });
        }
    }

    pub fn draw_circle(&mut self, center: Point, radius: f64, style: PolygonStyle) {
        self.queue.push(DrawCommand::Circle {
            center,
            radius,
            style,
        });
    }

    pub fn draw_marker(&mut self, position: Point, style: PointStyle) {
        self.queue.push(DrawCommand::Marker { position, style });
    }

    pub fn draw_text(&mut self, position: Point, content: String, style: TextStyle) {
        self.queue.push(DrawCommand::Text {
            position,
            content,
            style,
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.queue
    }

    /// Hand the finished queue to the backend, leaving the context empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.queue)
    }
}
