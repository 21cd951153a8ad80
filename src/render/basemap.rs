//! Static basemap layer.
//!
//! Redrawn only when the tiles-dirty flag is set (pan, zoom, or a tile
//! arriving). Computes the integer tile span covering the viewport at the
//! floored zoom, draws what the store has, fills the rest with the
//! placeholder color and hands a bounded batch of missing tiles to the
//! loader.

use crate::core::geo::{LatLng, Point, TileCoord, TILE_SIZE};
use crate::render::context::{Color, RenderContext};
use crate::tiles::cache::{TileSlot, TileStore};
use crate::tiles::loader::TileLoader;

/// Renders the static tile layer.
pub struct BasemapRenderer {
    /// Canvas fill behind everything.
    pub background: Color,
    /// Fill for tiles that have no image yet.
    pub placeholder: Color,
    /// Maximum new fetches issued per pass.
    pub fetch_batch: usize,
}

impl Default for BasemapRenderer {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x0f, 0x0f, 0x0f),
            placeholder: Color::rgb(0x1a, 0x1a, 0x1a),
            fetch_batch: 6,
        }
    }
}

impl BasemapRenderer {
    pub fn new(fetch_batch: usize) -> Self {
        Self {
            fetch_batch,
            ..Self::default()
        }
    }

    /// Draw one basemap frame and request up to `fetch_batch` missing
    /// tiles. Returns the number of fetches issued.
    pub fn render(
        &self,
        ctx: &mut RenderContext,
        center: &LatLng,
        zoom: f64,
        store: &mut TileStore,
        loader: &TileLoader,
    ) -> usize {
        let width = ctx.width;
        let height = ctx.height;

        ctx.begin_frame();
        ctx.fill_rect(Point::new(0.0, 0.0), Point::new(width, height), self.background);

        let z = zoom.floor().clamp(1.0, 18.0) as u8;
        let n = 2_i64.pow(z as u32);
        let (center_tx, center_ty) = TileCoord::indices_at(center, z);

        let tiles_x = (width / TILE_SIZE).ceil() as i64 + 1;
        let tiles_y = (height / TILE_SIZE).ceil() as i64 + 1;
        let start_tx = center_tx - tiles_x / 2;
        let start_ty = center_ty - tiles_y / 2;

        let mut missing = Vec::new();

        for ix in 0..tiles_x {
            for iy in 0..tiles_y {
                let tx = start_tx + ix;
                let ty = start_ty + iy;
                if tx < 0 || ty < 0 || tx >= n || ty >= n {
                    continue;
                }

                let origin = Point::new(
                    (tx - center_tx) as f64 * TILE_SIZE + width / 2.0,
                    (ty - center_ty) as f64 * TILE_SIZE + height / 2.0,
                );
                let coord = TileCoord::new(tx as u32, ty as u32, z);

                match store.status(&coord) {
                    TileSlot::Loaded(image) => ctx.draw_tile(image, origin),
                    slot => {
                        ctx.fill_rect(
                            origin,
                            Point::new(origin.x + TILE_SIZE, origin.y + TILE_SIZE),
                            self.placeholder,
                        );
                        if !slot.is_attempted() {
                            missing.push(coord);
                        }
                    }
                }
            }
        }

        let mut issued = 0;
        for coord in missing.into_iter().take(self.fetch_batch) {
            if store.mark_pending(coord) {
                loader.request(coord);
                issued += 1;
            }
        }

        if issued > 0 {
            log::debug!("basemap pass requested {} tiles at z{}", issued, z);
        }

        issued
    }
}
