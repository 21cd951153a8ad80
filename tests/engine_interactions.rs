//! Integration tests simulating real operator interactions: dragging,
//! zooming, scrubbing, drawing and the async tile flow.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trackmap::annotate::store::{MemoryShapeStore, ShapeStore};
use trackmap::annotate::tool::{TitlePrompt, ToolKind};
use trackmap::core::geo::{Point, TileCoord};
use trackmap::core::project;
use trackmap::render::context::DrawCommand;
use trackmap::tiles::loader::{TileFetch, TileLoader};
use trackmap::tiles::source::DarkBasemapSource;
use trackmap::tiles::cache::TileStore;
use trackmap::{EngineOptions, MapEngine, PointerEvent, Result};

/// Serves a valid 1x1 PNG and counts issued fetches.
struct CountingFetch {
    calls: AtomicUsize,
}

impl CountingFetch {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image::RgbaImage::new(1, 1))
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .expect("encode png");
        bytes
    }
}

#[async_trait]
impl TileFetch for CountingFetch {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::png_bytes())
    }
}

/// Always fails, for offline scenarios.
struct FailingFetch;

#[async_trait]
impl TileFetch for FailingFetch {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        Err("unreachable".into())
    }
}

struct Titled(&'static str);

impl TitlePrompt for Titled {
    fn request_title(&mut self) -> Option<String> {
        Some(self.0.to_string())
    }
}

/// Shape store shared between engine instances, to model one durable
/// backend across restarts.
#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<MemoryShapeStore>>);

impl ShapeStore for SharedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.0.lock().unwrap().set(key, value)
    }
}

fn engine_with_fetch(fetch: Arc<dyn TileFetch>) -> MapEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    MapEngine::with_tile_pipeline(
        EngineOptions::default(),
        Box::new(MemoryShapeStore::new()),
        Arc::new(DarkBasemapSource::new()),
        fetch,
    )
}

async fn settle(engine: &mut MapEngine) {
    // Let spawned fetches finish, then drain them on a frame tick.
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.frame();
}

#[tokio::test(flavor = "multi_thread")]
async fn simultaneous_requests_for_one_tile_fetch_once() {
    let fetch = Arc::new(CountingFetch::new());
    let loader = TileLoader::new(
        Arc::new(DarkBasemapSource::new()),
        fetch.clone(),
        Duration::from_secs(5),
    );
    let mut store = TileStore::new(150, 100);

    let coord = TileCoord::new(2437, 4942, 13);
    // Two callers race for the same tile; only the first transition to
    // pending wins the right to spawn a fetch.
    for _ in 0..2 {
        if store.mark_pending(coord) {
            loader.request(coord);
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);
    assert_eq!(loader.try_recv_results().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn tiles_flow_into_the_basemap() {
    let fetch = Arc::new(CountingFetch::new());
    let mut engine = engine_with_fetch(fetch.clone());

    // First frame issues the first bounded batch.
    engine.frame();
    assert_eq!(fetch.calls.load(Ordering::SeqCst), 6);

    // Arrivals dirty the basemap: the settle frame draws the first six
    // tiles and issues the next batch.
    settle(&mut engine).await;
    assert_eq!(engine.tile_store().loaded_len(), 6);
    assert_eq!(fetch.calls.load(Ordering::SeqCst), 12);

    // Once the second batch lands, the next pass composites all twelve.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let output = engine.frame();
    let commands = output.basemap.expect("tile arrivals dirty the basemap");
    let drawn = commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::Tile { .. }))
        .count();
    assert_eq!(drawn, 12);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_tiles_stay_placeholders_without_retry() {
    let mut engine = engine_with_fetch(Arc::new(FailingFetch));

    engine.frame();
    settle(&mut engine).await;
    assert_eq!(engine.tile_store().loaded_len(), 0);
    let attempted_after_failures = engine.tile_store().attempted_len();
    assert!(attempted_after_failures >= 6);

    // Re-render by nudging the view: failed tiles must not be re-requested;
    // only previously untouched tiles join the attempted set.
    engine.zoom_in();
    engine.frame();
    settle(&mut engine).await;
    let mut seen = engine.tile_store().attempted_len();
    assert!(seen >= attempted_after_failures);

    // Pans at the same zoom re-render but never shrink the attempted set.
    engine.zoom_out();
    engine.frame();
    settle(&mut engine).await;
    seen = engine.tile_store().attempted_len();
    assert!(seen >= attempted_after_failures);
}

#[tokio::test(flavor = "multi_thread")]
async fn wheel_zoom_keeps_the_point_under_the_cursor() {
    let mut engine = engine_with_fetch(Arc::new(CountingFetch::new()));
    engine.frame();

    let pointer = Point::new(611.0, 173.0);
    let before = project::pixel_to_lon_lat(
        &pointer,
        engine.viewport().zoom(),
        &engine.viewport().center(),
        &engine.viewport().size(),
    );

    let mut prompt = Titled("");
    engine.handle_pointer(
        PointerEvent::Wheel {
            position: pointer,
            delta_y: -1.0,
        },
        &mut prompt,
    );
    engine.frame();

    let after = project::lon_lat_to_pixel(
        before.lng,
        before.lat,
        engine.viewport().zoom(),
        &engine.viewport().center(),
        &engine.viewport().size(),
    );
    assert!(after.distance_to(&pointer) < 1.0);
    assert!((engine.viewport().zoom() - 13.3).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn inertial_coasting_decays_to_rest() {
    let mut engine = engine_with_fetch(Arc::new(CountingFetch::new()));
    engine.frame();

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
            position: Point::new(410.0, 310.0),
            at_ms: 16.0,
        },
        &mut prompt,
    );
    engine.handle_pointer(PointerEvent::Up, &mut prompt);
    assert!(engine.viewport().is_animating());

    // 10 px/tick at friction 0.92 falls under 0.5 within 36 ticks.
    let mut ticks = 0;
    while engine.viewport().is_animating() {
        engine.frame();
        ticks += 1;
        assert!(ticks < 100, "coasting never stopped");
    }
    assert!(ticks <= 37);

    let rest = engine.viewport().center();
    engine.frame();
    assert_eq!(engine.viewport().center(), rest);
}

#[tokio::test(flavor = "multi_thread")]
async fn polygon_with_two_vertices_never_persists() {
    let mut engine = engine_with_fetch(Arc::new(CountingFetch::new()));
    let mut prompt = Titled("zone");

    engine.select_tool(ToolKind::Polygon);
    for (x, y) in [(300.0, 200.0), (350.0, 260.0)] {
        engine.handle_pointer(
            PointerEvent::Down {
                position: Point::new(x, y),
                at_ms: 0.0,
            },
            &mut prompt,
        );
    }
    engine.handle_pointer(
        PointerEvent::DoubleClick {
            position: Point::new(350.0, 260.0),
        },
        &mut prompt,
    );

    assert!(engine.shapes().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn shapes_survive_an_engine_restart() {
    let store = SharedStore::default();

    {
        let mut engine = MapEngine::with_tile_pipeline(
            EngineOptions::default(),
            Box::new(store.clone()),
            Arc::new(DarkBasemapSource::new()),
            Arc::new(CountingFetch::new()),
        );
        let mut prompt = Titled("perimeter");

        engine.select_tool(ToolKind::Polygon);
        for (x, y) in [(300.0, 200.0), (420.0, 210.0), (380.0, 320.0)] {
            engine.handle_pointer(
                PointerEvent::Down {
                    position: Point::new(x, y),
                    at_ms: 0.0,
                },
                &mut prompt,
            );
        }
        engine.handle_pointer(
            PointerEvent::DoubleClick {
                position: Point::new(380.0, 320.0),
            },
            &mut prompt,
        );
        assert_eq!(engine.shapes().len(), 1);
    }

    // A fresh engine against the same backend sees the same list.
    let engine = MapEngine::with_tile_pipeline(
        EngineOptions::default(),
        Box::new(store),
        Arc::new(DarkBasemapSource::new()),
        Arc::new(CountingFetch::new()),
    );
    assert_eq!(engine.shapes().len(), 1);
    assert_eq!(engine.shapes()[0].title(), Some("perimeter"));
}
