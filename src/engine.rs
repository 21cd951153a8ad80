//! The map engine facade.
//!
//! One `MapEngine` owns the viewport, tile pipeline, trajectory state,
//! annotation tool and event registry, and drives them from a cooperative
//! frame loop: input handlers only mutate state and set dirty flags, and
//! the host calls [`MapEngine::frame`] once per display tick to commit
//! coalesced viewport updates, advance inertia, drain finished tile fetches
//! and rebuild whichever layers went dirty.

use crate::annotate::shape::Shape;
use crate::annotate::store::{self, ShapeStore};
use crate::annotate::tool::{ShapeTool, TitlePrompt, ToolKind};
use crate::core::config::EngineOptions;
use crate::core::geo::{LatLng, Point};
use crate::core::project;
use crate::core::viewport::ViewportController;
use crate::input::events::{EventManager, MapEvent, PointerEvent};
use crate::render::basemap::BasemapRenderer;
use crate::render::context::{DrawCommand, RenderContext};
use crate::render::overlay::OverlayRenderer;
use crate::spatial::TrackIndex;
use crate::tiles::cache::TileStore;
use crate::tiles::loader::{HttpFetch, TileFetch, TileLoader};
use crate::tiles::source::{DarkBasemapSource, TileSource};
use crate::track::{PlaybackWindow, Trajectory};
use crate::Result;
use std::sync::Arc;

/// Layers rebuilt by one frame tick. `None` means the layer was clean and
/// the backend keeps its previous raster.
#[derive(Debug)]
pub struct FrameOutput {
    pub basemap: Option<Vec<DrawCommand>>,
    pub overlay: Option<Vec<DrawCommand>>,
}

/// The interactive map canvas engine.
pub struct MapEngine {
    options: EngineOptions,
    viewport: ViewportController,

    tile_store: TileStore,
    loader: TileLoader,
    basemap: BasemapRenderer,
    overlay: OverlayRenderer,
    base_ctx: RenderContext,
    overlay_ctx: RenderContext,
    device_pixel_ratio: f64,

    detections: Vec<Trajectory>,
    track_index: TrackIndex,
    window: PlaybackWindow,
    hovered: Option<String>,

    shapes: Vec<Shape>,
    shape_store: Box<dyn ShapeStore>,
    tool: ShapeTool,

    events: EventManager,
    tiles_dirty: bool,
    overlay_dirty: bool,
}

impl MapEngine {
    /// Engine with the production tile pipeline (dark basemap over HTTP).
    pub fn new(options: EngineOptions, shape_store: Box<dyn ShapeStore>) -> Self {
        Self::with_tile_pipeline(
            options,
            shape_store,
            Arc::new(DarkBasemapSource::new()),
            Arc::new(HttpFetch),
        )
    }

    /// Engine with a custom tile source and fetcher (tests, offline hosts).
    pub fn with_tile_pipeline(
        options: EngineOptions,
        shape_store: Box<dyn ShapeStore>,
        source: Arc<dyn TileSource>,
        fetch: Arc<dyn TileFetch>,
    ) -> Self {
        let viewport = ViewportController::new(&options);
        let loader = TileLoader::new(source, fetch, options.fetch_timeout);
        let shapes = store::load_shapes(shape_store.as_ref());

        let size = options.size;
        let device_pixel_ratio = 1.0;

        Self {
            viewport,
            tile_store: TileStore::new(options.evict_high, options.evict_keep),
            loader,
            basemap: BasemapRenderer::new(options.fetch_batch),
            overlay: OverlayRenderer::default(),
            base_ctx: RenderContext::new(
                size.x,
                size.y,
                device_pixel_ratio,
                options.pixel_ratio_cap,
            ),
            overlay_ctx: RenderContext::new(
                size.x,
                size.y,
                device_pixel_ratio,
                options.pixel_ratio_cap,
            ),
            device_pixel_ratio,
            detections: Vec::new(),
            track_index: TrackIndex::new(),
            window: PlaybackWindow::new(0, 0, 60.0),
            hovered: None,
            shapes,
            shape_store,
            tool: ShapeTool::new(),
            events: EventManager::new(),
            tiles_dirty: true,
            overlay_dirty: true,
            options,
        }
    }

    // --- inspection --------------------------------------------------------

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn tile_store(&self) -> &TileStore {
        &self.tile_store
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn tool(&self) -> &ShapeTool {
        &self.tool
    }

    /// Pretty-printed JSON export of the shape list.
    pub fn shapes_json(&self) -> Result<String> {
        store::shapes_json(&self.shapes)
    }

    /// Register an upward event listener (`"viewchanged"`, `"hoverchanged"`,
    /// `"shapeschanged"`).
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.events.on(event_type, callback);
    }

    // --- host inputs -------------------------------------------------------

    /// Replace the displayed trajectory set (already sorted and
    /// deduplicated by the data layer).
    pub fn set_detections(&mut self, detections: Vec<Trajectory>) {
        self.track_index = TrackIndex::build(&detections);
        self.detections = detections;
        self.overlay_dirty = true;
    }

    /// Move the timeline cursor / selected hour.
    pub fn set_playback(&mut self, window: PlaybackWindow) {
        if self.window != window {
            self.window = window;
            self.overlay_dirty = true;
        }
    }

    /// Host-driven hover (e.g. from the sidebar list). Does not re-emit a
    /// hover event.
    pub fn set_hovered(&mut self, id: Option<String>) {
        if self.hovered != id {
            self.hovered = id;
            self.overlay_dirty = true;
        }
    }

    /// Resize the canvas.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.viewport.set_size(Point::new(width, height));
        self.rebuild_contexts(width, height);
    }

    /// Update the display's pixel ratio (capped by the options).
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.device_pixel_ratio = ratio;
        let size = self.viewport.size();
        self.rebuild_contexts(size.x, size.y);
    }

    fn rebuild_contexts(&mut self, width: f64, height: f64) {
        let cap = self.options.pixel_ratio_cap;
        self.base_ctx = RenderContext::new(width, height, self.device_pixel_ratio, cap);
        self.overlay_ctx = RenderContext::new(width, height, self.device_pixel_ratio, cap);
        self.tiles_dirty = true;
        self.overlay_dirty = true;
    }

    /// Step zoom programmatically (the +/- buttons).
    pub fn zoom_in(&mut self) {
        let before = self.viewport.zoom();
        self.viewport.zoom_in();
        if self.viewport.zoom() != before {
            self.after_view_change();
        }
    }

    pub fn zoom_out(&mut self) {
        let before = self.viewport.zoom();
        self.viewport.zoom_out();
        if self.viewport.zoom() != before {
            self.after_view_change();
        }
    }

    /// Jump the view (e.g. centering on a device).
    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        let before = (self.viewport.center(), self.viewport.zoom());
        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);
        if (self.viewport.center(), self.viewport.zoom()) != before {
            self.after_view_change();
        }
    }

    fn after_view_change(&mut self) {
        self.tiles_dirty = true;
        self.overlay_dirty = true;
        self.events.emit(MapEvent::ViewChanged {
            center: self.viewport.center(),
            zoom: self.viewport.zoom(),
        });
    }

    // --- annotation --------------------------------------------------------

    /// Select a drawing tool; reselecting the active tool deactivates it.
    pub fn select_tool(&mut self, kind: ToolKind) {
        self.tool.toggle(kind);
        self.overlay_dirty = true;
    }

    /// Abandon any in-progress shape.
    pub fn cancel_drawing(&mut self) {
        self.tool.cancel();
        self.overlay_dirty = true;
    }

    /// Remove one persisted shape by index.
    pub fn remove_shape(&mut self, index: usize) -> Option<Shape> {
        if index >= self.shapes.len() {
            return None;
        }
        let removed = self.shapes.remove(index);
        self.persist_shapes();
        Some(removed)
    }

    /// Remove all persisted shapes.
    pub fn clear_shapes(&mut self) {
        if self.shapes.is_empty() {
            return;
        }
        self.shapes.clear();
        self.persist_shapes();
    }

    fn commit_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
        self.persist_shapes();
    }

    fn persist_shapes(&mut self) {
        if let Err(e) = store::save_shapes(self.shape_store.as_mut(), &self.shapes) {
            log::warn!("failed to persist shapes: {}", e);
        }
        self.events.emit(MapEvent::ShapesChanged {
            count: self.shapes.len(),
        });
        self.overlay_dirty = true;
    }

    // --- pointer input -----------------------------------------------------

    /// Feed one pointer/wheel event. `prompt` is consulted only when a
    /// shape finalize needs a title.
    pub fn handle_pointer(&mut self, event: PointerEvent, prompt: &mut dyn TitlePrompt) {
        match event {
            PointerEvent::Down { position, at_ms } => {
                if self.tool.is_active() {
                    let geo = self.screen_to_geo(&position);
                    if let Some(shape) = self.tool.pointer_down(geo, prompt) {
                        self.commit_shape(shape);
                    }
                    self.overlay_dirty = true;
                } else {
                    self.viewport.pointer_down(position, at_ms);
                }
            }
            PointerEvent::Move { position, at_ms } => {
                if self.tool.is_active() {
                    let geo = self.screen_to_geo(&position);
                    self.tool.pointer_move(geo);
                    self.overlay_dirty = true;
                } else if self.viewport.is_dragging() {
                    // Commits are coalesced; applied on the next frame tick.
                    self.viewport.pointer_move(position, at_ms);
                } else {
                    self.update_hover(&position);
                }
            }
            PointerEvent::Up | PointerEvent::Leave => {
                if self.tool.is_active() {
                    if let Some(shape) = self.tool.pointer_up(prompt) {
                        self.commit_shape(shape);
                    }
                    self.overlay_dirty = true;
                } else {
                    self.viewport.pointer_up();
                }
            }
            PointerEvent::DoubleClick { .. } => {
                if self.tool.is_active() {
                    if let Some(shape) = self.tool.double_click(prompt) {
                        self.commit_shape(shape);
                    }
                    self.overlay_dirty = true;
                }
            }
            PointerEvent::Wheel { position, delta_y } => {
                if self.viewport.wheel(&position, delta_y) {
                    self.after_view_change();
                }
            }
        }
    }

    fn screen_to_geo(&self, position: &Point) -> LatLng {
        project::pixel_to_lon_lat(
            position,
            self.viewport.zoom(),
            &self.viewport.center(),
            &self.viewport.size(),
        )
    }

    fn update_hover(&mut self, position: &Point) {
        let geo = self.screen_to_geo(position);
        let radius_deg =
            self.options.hover_tolerance_px * project::lng_degrees_per_pixel(self.viewport.zoom());

        let id = self
            .track_index
            .nearest_within(&geo, radius_deg)
            .map(String::from);

        if id != self.hovered {
            self.hovered = id.clone();
            self.overlay_dirty = true;
            self.events.emit(MapEvent::HoverChanged { id });
        }
    }

    // --- frame loop --------------------------------------------------------

    /// One display tick: commit the coalesced drag target, advance inertia,
    /// apply finished tile fetches and rebuild dirty layers. Also dispatches
    /// queued events to listeners.
    pub fn frame(&mut self) -> FrameOutput {
        let mut view_changed = self.viewport.commit_pending();
        if self.viewport.is_animating() && self.viewport.animate_tick() {
            view_changed = true;
        }
        if view_changed {
            self.tiles_dirty = true;
            self.overlay_dirty = true;
            self.events.emit(MapEvent::ViewChanged {
                center: self.viewport.center(),
                zoom: self.viewport.zoom(),
            });
        }

        for result in self.loader.try_recv_results() {
            match result.image {
                Some(image) => {
                    self.tile_store.insert(result.coord, image);
                    self.tiles_dirty = true;
                }
                None => self.tile_store.mark_failed(result.coord),
            }
        }

        let basemap = if self.tiles_dirty {
            self.basemap.render(
                &mut self.base_ctx,
                &self.viewport.center(),
                self.viewport.zoom(),
                &mut self.tile_store,
                &self.loader,
            );
            self.tiles_dirty = false;
            Some(self.base_ctx.take_commands())
        } else {
            None
        };

        let overlay = if self.overlay_dirty {
            let draft = self.tool.draft();
            self.overlay.render(
                &mut self.overlay_ctx,
                &self.viewport.center(),
                self.viewport.zoom(),
                &self.detections,
                &self.window,
                self.hovered.as_deref(),
                &self.shapes,
                draft.as_ref(),
            );
            self.overlay_dirty = false;
            Some(self.overlay_ctx.take_commands())
        } else {
            None
        };

        self.events.process_events();

        FrameOutput { basemap, overlay }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::store::MemoryShapeStore;
    use crate::track::TrackPoint;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct NeverFetch;

    #[async_trait]
    impl TileFetch for NeverFetch {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Err("offline".into())
        }
    }

    struct Titled(&'static str);

    impl TitlePrompt for Titled {
        fn request_title(&mut self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn engine() -> MapEngine {
        engine_with_store(Box::new(MemoryShapeStore::new()))
    }

    fn engine_with_store(store: Box<dyn ShapeStore>) -> MapEngine {
        MapEngine::with_tile_pipeline(
            EngineOptions::default(),
            store,
            Arc::new(DarkBasemapSource::new()),
            Arc::new(NeverFetch),
        )
    }

    fn near_center_trajectory(id: &str) -> Trajectory {
        let points = (0..3)
            .map(|i| TrackPoint::new(-41.472 + i as f64 * 0.0005, -72.936, 100.0, i * 10_000))
            .collect();
        Trajectory::new(id, points)
    }

    #[test]
    fn test_first_frame_renders_both_layers() {
        let mut engine = engine();
        let output = engine.frame();
        assert!(output.basemap.is_some());
        assert!(output.overlay.is_some());

        // Nothing changed: both layers stay clean.
        let output = engine.frame();
        assert!(output.basemap.is_none());
        assert!(output.overlay.is_none());
    }

    #[test]
    fn test_drag_commits_once_per_frame() {
        let mut engine = engine();
        engine.frame();
        let before = engine.viewport().center();

        let mut prompt = Titled("");
        engine.handle_pointer(
            PointerEvent::Down {
                position: Point::new(400.0, 300.0),
                at_ms: 0.0,
            },
            &mut prompt,
        );
        engine.handle_pointer(
            PointerEvent::Move {
                position: Point::new(420.0, 300.0),
                at_ms: 8.0,
            },
            &mut prompt,
        );
        engine.handle_pointer(
            PointerEvent::Move {
                position: Point::new(440.0, 300.0),
                at_ms: 16.0,
            },
            &mut prompt,
        );

        // Center untouched until the frame tick commits the latest target.
        assert_eq!(engine.viewport().center(), before);

        let output = engine.frame();
        assert_ne!(engine.viewport().center(), before);
        assert!(output.basemap.is_some());
        assert!(output.overlay.is_some());
    }

    #[test]
    fn test_view_change_emits_event() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let mut engine = engine();
        engine.on("viewchanged", move |event| {
            if matches!(event, MapEvent::ViewChanged { .. }) {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        engine.zoom_in();
        engine.frame();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(engine.viewport().zoom(), 14.0);
    }

    #[test]
    fn test_hover_hit_and_event() {
        let emitted: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let emitted_clone = emitted.clone();

        let mut engine = engine();
        engine.on("hoverchanged", move |event| {
            if let MapEvent::HoverChanged { id } = event {
                emitted_clone.lock().unwrap().push(id.clone());
            }
        });
        engine.set_detections(vec![near_center_trajectory("t7")]);

        let mut prompt = Titled("");
        // The first fix projects to the viewport center.
        engine.handle_pointer(
            PointerEvent::Move {
                position: Point::new(400.0, 300.0),
                at_ms: 0.0,
            },
            &mut prompt,
        );
        assert_eq!(engine.hovered(), Some("t7"));

        // Far corner: hover clears.
        engine.handle_pointer(
            PointerEvent::Move {
                position: Point::new(5.0, 5.0),
                at_ms: 16.0,
            },
            &mut prompt,
        );
        assert_eq!(engine.hovered(), None);

        engine.frame();
        assert_eq!(
            emitted.lock().unwrap().as_slice(),
            &[Some("t7".to_string()), None]
        );
    }

    #[test]
    fn test_annotation_commit_persists() {
        let mut engine = engine();
        let mut prompt = Titled("pad");

        engine.select_tool(ToolKind::Rectangle);
        engine.handle_pointer(
            PointerEvent::Down {
                position: Point::new(300.0, 200.0),
                at_ms: 0.0,
            },
            &mut prompt,
        );
        engine.handle_pointer(
            PointerEvent::Move {
                position: Point::new(420.0, 320.0),
                at_ms: 16.0,
            },
            &mut prompt,
        );
        engine.handle_pointer(PointerEvent::Up, &mut prompt);

        assert_eq!(engine.shapes().len(), 1);
        assert_eq!(engine.shapes()[0].title(), Some("pad"));
        // Tool deactivated after the commit; dragging works again.
        assert!(!engine.tool().is_active());

        let json = engine.shapes_json().unwrap();
        assert!(json.contains("rectangle"));
    }

    #[test]
    fn test_shapes_load_from_store_on_startup() {
        let mut store = MemoryShapeStore::new();
        store::save_shapes(
            &mut store,
            &[Shape::Label {
                points: [[-72.9, -41.4]],
                title: "site".into(),
            }],
        )
        .unwrap();

        let engine = engine_with_store(Box::new(store));
        assert_eq!(engine.shapes().len(), 1);
    }

    #[test]
    fn test_corrupt_store_loads_empty() {
        let mut store = MemoryShapeStore::new();
        store
            .set(crate::annotate::store::SHAPES_STORAGE_KEY, "][ junk")
            .unwrap();

        let engine = engine_with_store(Box::new(store));
        assert!(engine.shapes().is_empty());
    }

    #[test]
    fn test_remove_shape_persists() {
        let mut engine = engine();
        let mut prompt = Titled("zone");

        engine.select_tool(ToolKind::Label);
        engine.handle_pointer(
            PointerEvent::Down {
                position: Point::new(100.0, 100.0),
                at_ms: 0.0,
            },
            &mut prompt,
        );
        assert_eq!(engine.shapes().len(), 1);

        assert!(engine.remove_shape(0).is_some());
        assert!(engine.shapes().is_empty());
        assert!(engine.remove_shape(0).is_none());
    }

    #[test]
    fn test_playback_change_dirties_overlay_only() {
        let mut engine = engine();
        engine.frame();

        engine.set_playback(PlaybackWindow::new(0, 14, 30.0));
        let output = engine.frame();
        assert!(output.basemap.is_none());
        assert!(output.overlay.is_some());
    }

    #[test]
    fn test_failed_tiles_are_recorded() {
        let mut engine = engine();
        // First frame requests a batch; without a runtime the loader
        // resolves them to failures immediately.
        engine.frame();
        // Second frame drains the failures into the store.
        engine.frame();

        assert!(engine.tile_store().attempted_len() > 0);
        assert_eq!(engine.tile_store().loaded_len(), 0);
    }
}
