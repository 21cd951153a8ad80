//! Dynamic overlay layer.
//!
//! Redrawn on any change to trajectories, cursor, hover, shapes or the
//! viewport. Draws the center marker, persisted and in-progress shapes, and
//! every visible trajectory as a drop-shadowed polyline with distinct start
//! and end markers. Path points are culled against the viewport with a
//! margin so partially visible segments still draw; markers cull against
//! the exact viewport.

use crate::annotate::shape::{vertex_to_lat_lng, Shape};
use crate::annotate::tool::DraftShape;
use crate::core::geo::{LatLng, Point};
use crate::core::project;
use crate::render::context::{
    Color, LineStyle, PointStyle, PolygonStyle, RenderContext, Shadow, TextStyle,
};
use crate::track::{self, DurationClass, PlaybackWindow, Trajectory};

const CENTER_MARKER: Color = Color::rgb(0x3b, 0x82, 0xf6);
const TRACK_START: Color = Color::rgb(0x10, 0xb9, 0x81);
const TRACK_END: Color = Color::rgb(0xef, 0x44, 0x44);
const SHAPE_STROKE: Color = Color::rgb(0x7d, 0xd3, 0xfc);
const SHAPE_FILL: Color = Color::rgba(0x7d, 0xd3, 0xfc, 77);

const PATH_SHADOW: Shadow = Shadow {
    color: Color::rgba(0, 0, 0, 204),
    blur: 2.0,
    offset: Point { x: 1.0, y: 1.0 },
};

fn shape_style(filled: bool) -> PolygonStyle {
    PolygonStyle {
        fill: filled.then_some(SHAPE_FILL),
        stroke: SHAPE_STROKE,
        stroke_width: 2.0,
    }
}

fn title_style() -> TextStyle {
    TextStyle {
        color: Color::WHITE,
        size: 14.0,
        bold: true,
    }
}

fn marker_style(fill: Color, radius: f64) -> PointStyle {
    PointStyle {
        fill,
        stroke: Color::WHITE,
        stroke_width: 2.0,
        radius,
    }
}

/// Renders the dynamic layer.
pub struct OverlayRenderer {
    /// Base trajectory stroke width; hovered trajectories draw at double.
    pub track_width: f64,
    /// Cull margin for path segments, in pixels.
    pub path_margin: f64,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self {
            track_width: 4.0,
            path_margin: 50.0,
        }
    }
}

impl OverlayRenderer {
    /// Draw one overlay frame.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        ctx: &mut RenderContext,
        center: &LatLng,
        zoom: f64,
        detections: &[Trajectory],
        window: &PlaybackWindow,
        hovered: Option<&str>,
        shapes: &[Shape],
        draft: Option<&DraftShape>,
    ) {
        ctx.begin_frame();
        let size = Point::new(ctx.width, ctx.height);

        // Fixed marker at the viewport center
        ctx.draw_marker(
            Point::new(size.x / 2.0, size.y / 2.0),
            marker_style(CENTER_MARKER, 6.0),
        );

        for shape in shapes {
            self.draw_shape(ctx, shape, center, zoom, &size);
        }
        if let Some(draft) = draft {
            self.draw_draft(ctx, draft, center, zoom, &size);
        }

        for trajectory in detections {
            self.draw_trajectory(ctx, trajectory, center, zoom, &size, window, hovered);
        }
    }

    fn project(&self, geo: &LatLng, center: &LatLng, zoom: f64, size: &Point) -> Point {
        project::lon_lat_to_pixel(geo.lng, geo.lat, zoom, center, size)
    }

    fn draw_shape(
        &self,
        ctx: &mut RenderContext,
        shape: &Shape,
        center: &LatLng,
        zoom: f64,
        size: &Point,
    ) {
        match shape {
            Shape::Polygon { points, title } => {
                let px: Vec<Point> = points
                    .iter()
                    .map(|v| self.project(&vertex_to_lat_lng(v), center, zoom, size))
                    .collect();
                let closed = px.len() > 2;
                ctx.draw_polygon(px.clone(), closed, shape_style(closed));

                if let Some(title) = title {
                    if let Some(centroid) = polygon_centroid(&px) {
                        ctx.draw_text(centroid, title.clone(), title_style());
                    }
                }
            }
            Shape::Rectangle { points, title } => {
                let a = self.project(&vertex_to_lat_lng(&points[0]), center, zoom, size);
                let b = self.project(&vertex_to_lat_lng(&points[1]), center, zoom, size);
                let min = Point::new(a.x.min(b.x), a.y.min(b.y));
                let max = Point::new(a.x.max(b.x), a.y.max(b.y));

                ctx.draw_polygon(
                    vec![
                        min,
                        Point::new(max.x, min.y),
                        max,
                        Point::new(min.x, max.y),
                    ],
                    true,
                    shape_style(true),
                );

                if let Some(title) = title {
                    ctx.draw_text(
                        Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0),
                        title.clone(),
                        title_style(),
                    );
                }
            }
            Shape::Circle { points, title } => {
                let c = self.project(&vertex_to_lat_lng(&points[0]), center, zoom, size);
                let e = self.project(&vertex_to_lat_lng(&points[1]), center, zoom, size);
                // Radius is the pixel distance between the two geographic
                // points at the current view.
                ctx.draw_circle(c, c.distance_to(&e), shape_style(true));

                if let Some(title) = title {
                    ctx.draw_text(c, title.clone(), title_style());
                }
            }
            Shape::Label { points, title } => {
                let p = self.project(&vertex_to_lat_lng(&points[0]), center, zoom, size);
                ctx.draw_text(p, title.clone(), title_style());
            }
        }
    }

    fn draw_draft(
        &self,
        ctx: &mut RenderContext,
        draft: &DraftShape,
        center: &LatLng,
        zoom: f64,
        size: &Point,
    ) {
        match draft {
            DraftShape::Polygon { vertices, preview } => {
                let mut px: Vec<Point> = vertices
                    .iter()
                    .map(|v| self.project(v, center, zoom, size))
                    .collect();
                if let Some(preview) = preview {
                    px.push(self.project(preview, center, zoom, size));
                }

                // Only a settled ring (no pointer-following vertex) closes
                // and fills.
                let closed = preview.is_none() && px.len() > 2;
                ctx.draw_polygon(px, closed, shape_style(closed));
            }
            DraftShape::Rectangle { a, b } => {
                let pa = self.project(a, center, zoom, size);
                let pb = self.project(b, center, zoom, size);
                let min = Point::new(pa.x.min(pb.x), pa.y.min(pb.y));
                let max = Point::new(pa.x.max(pb.x), pa.y.max(pb.y));
                ctx.draw_polygon(
                    vec![
                        min,
                        Point::new(max.x, min.y),
                        max,
                        Point::new(min.x, max.y),
                    ],
                    true,
                    shape_style(true),
                );
            }
            DraftShape::Circle { center: c, edge } => {
                let pc = self.project(c, center, zoom, size);
                let pe = self.project(edge, center, zoom, size);
                ctx.draw_circle(pc, pc.distance_to(&pe), shape_style(true));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_trajectory(
        &self,
        ctx: &mut RenderContext,
        trajectory: &Trajectory,
        center: &LatLng,
        zoom: f64,
        size: &Point,
        window: &PlaybackWindow,
        hovered: Option<&str>,
    ) {
        let visible = track::visible_points(&trajectory.points, window);
        if visible.len() < 2 {
            return;
        }

        // Color comes from the full trajectory, not the windowed subset.
        let color = DurationClass::classify(trajectory).color();
        let is_hovered = hovered == Some(trajectory.id.as_str());
        let width = if is_hovered {
            self.track_width * 2.0
        } else {
            self.track_width
        };

        let margin = self.path_margin;
        let path: Vec<Point> = visible
            .iter()
            .map(|p| self.project(&LatLng::new(p.lat, p.lng), center, zoom, size))
            .filter(|px| {
                px.x >= -margin && px.x <= size.x + margin && px.y >= -margin
                    && px.y <= size.y + margin
            })
            .collect();

        ctx.draw_line(
            path,
            LineStyle {
                color,
                width,
                rounded: true,
                shadow: Some(PATH_SHADOW),
            },
        );

        let first = &visible[0];
        let start = self.project(&LatLng::new(first.lat, first.lng), center, zoom, size);
        if within_viewport(&start, size) {
            ctx.draw_marker(start, marker_style(TRACK_START, 5.0));
        }

        let last = &visible[visible.len() - 1];
        let end = self.project(&LatLng::new(last.lat, last.lng), center, zoom, size);
        if within_viewport(&end, size) {
            ctx.draw_marker(end, marker_style(TRACK_END, 5.0));
        }
    }
}

fn within_viewport(p: &Point, size: &Point) -> bool {
    p.x >= 0.0 && p.x <= size.x && p.y >= 0.0 && p.y <= size.y
}

fn polygon_centroid(px: &[Point]) -> Option<Point> {
    if px.is_empty() {
        return None;
    }
    let sum = px
        .iter()
        .fold(Point::default(), |acc, p| acc.add(p));
    Some(sum.multiply(1.0 / px.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::DrawCommand;
    use crate::track::TrackPoint;

    const DAY: i64 = 0;

    fn window_all() -> PlaybackWindow {
        PlaybackWindow::new(DAY, 0, 60.0)
    }

    fn ctx() -> RenderContext {
        RenderContext::new(800.0, 600.0, 1.0, 2.0)
    }

    fn near_center_trajectory(id: &str) -> Trajectory {
        let points = (0..4)
            .map(|i| TrackPoint::new(-41.472 + i as f64 * 0.0005, -72.936, 100.0, i * 10_000))
            .collect();
        Trajectory::new(id, points)
    }

    fn line_widths(ctx: &RenderContext) -> Vec<f64> {
        ctx.commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { style, .. } => Some(style.width),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_center_marker_always_drawn() {
        let mut ctx = ctx();
        OverlayRenderer::default().render(
            &mut ctx,
            &LatLng::new(-41.472, -72.936),
            13.0,
            &[],
            &window_all(),
            None,
            &[],
            None,
        );

        assert!(matches!(
            ctx.commands().first(),
            Some(DrawCommand::Marker { position, .. })
                if *position == Point::new(400.0, 300.0)
        ));
    }

    #[test]
    fn test_trajectory_draws_path_and_end_markers() {
        let mut ctx = ctx();
        let traj = near_center_trajectory("t1");
        OverlayRenderer::default().render(
            &mut ctx,
            &LatLng::new(-41.472, -72.936),
            13.0,
            std::slice::from_ref(&traj),
            &window_all(),
            None,
            &[],
            None,
        );

        assert_eq!(line_widths(&ctx), vec![4.0]);
        let markers = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Marker { .. }))
            .count();
        // Center marker + start + end
        assert_eq!(markers, 3);
    }

    #[test]
    fn test_hover_doubles_stroke_width() {
        let mut ctx = ctx();
        let traj = near_center_trajectory("t1");
        OverlayRenderer::default().render(
            &mut ctx,
            &LatLng::new(-41.472, -72.936),
            13.0,
            std::slice::from_ref(&traj),
            &window_all(),
            Some("t1"),
            &[],
            None,
        );

        assert_eq!(line_widths(&ctx), vec![8.0]);
    }

    #[test]
    fn test_single_visible_point_draws_no_path() {
        let mut ctx = ctx();
        let traj = near_center_trajectory("t1");
        // Cursor before the second fix: only one point visible
        let window = PlaybackWindow::new(DAY, 0, 0.1);
        OverlayRenderer::default().render(
            &mut ctx,
            &LatLng::new(-41.472, -72.936),
            13.0,
            std::slice::from_ref(&traj),
            &window,
            None,
            &[],
            None,
        );

        assert!(line_widths(&ctx).is_empty());
    }

    #[test]
    fn test_far_away_trajectory_culls_markers() {
        let mut ctx = ctx();
        let points = vec![
            TrackPoint::new(40.0, 120.0, 100.0, 0),
            TrackPoint::new(40.1, 120.1, 100.0, 10_000),
        ];
        let traj = Trajectory::new("far", points);
        OverlayRenderer::default().render(
            &mut ctx,
            &LatLng::new(-41.472, -72.936),
            13.0,
            std::slice::from_ref(&traj),
            &window_all(),
            None,
            &[],
            None,
        );

        // Only the center marker; the far trajectory contributes nothing.
        let markers = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Marker { .. }))
            .count();
        assert_eq!(markers, 1);
        assert!(line_widths(&ctx).is_empty());
    }

    #[test]
    fn test_shapes_and_draft_render() {
        let mut ctx = ctx();
        let shapes = vec![Shape::Circle {
            points: [[-72.936, -41.472], [-72.930, -41.472]],
            title: Some("range".into()),
        }];
        let draft = DraftShape::Polygon {
            vertices: vec![LatLng::new(-41.47, -72.93), LatLng::new(-41.48, -72.93)],
            preview: Some(LatLng::new(-41.48, -72.94)),
        };

        OverlayRenderer::default().render(
            &mut ctx,
            &LatLng::new(-41.472, -72.936),
            13.0,
            &[],
            &window_all(),
            None,
            &shapes,
            Some(&draft),
        );

        let circles = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .count();
        assert_eq!(circles, 1);

        // Draft with a preview vertex strokes an open ring
        assert!(ctx.commands().iter().any(|c| matches!(
            c,
            DrawCommand::Polygon { closed: false, exterior, .. } if exterior.len() == 3
        )));

        // Title text for the circle
        assert!(ctx
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCommand::Text { content, .. } if content == "range")));
    }
}
