//! Viewport-relative Web-Mercator projection math.
//!
//! Pure, stateless functions shared by the viewport controller and both
//! render passes. Screen coordinates are relative to a viewport described by
//! its geographic center and pixel size; world coordinates live on the
//! square Mercator pixel plane whose side is `256 * 2^zoom`.

use crate::core::geo::{LatLng, Point, TILE_SIZE};
use std::f64::consts::PI;

/// World pixel-plane side length at a zoom level (fractional zooms allowed).
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2_f64.powf(zoom)
}

/// Forward Web-Mercator projection onto the world pixel plane.
pub fn world_pixel(lng: f64, lat: f64, zoom: f64) -> Point {
    let world = world_size(zoom);

    let x = (lng + 180.0) * (world / 360.0);
    let y = world / 2.0 - world * ((PI / 4.0 + lat * PI / 360.0).tan().ln()) / (2.0 * PI);

    Point::new(x, y)
}

/// Projects a geographic coordinate to screen pixels for a viewport with the
/// given center and size.
pub fn lon_lat_to_pixel(lng: f64, lat: f64, zoom: f64, center: &LatLng, size: &Point) -> Point {
    let p = world_pixel(lng, lat, zoom);
    let c = world_pixel(center.lng, center.lat, zoom);

    Point::new(p.x - c.x + size.x / 2.0, p.y - c.y + size.y / 2.0)
}

/// Exact inverse of [`lon_lat_to_pixel`]: recovers the geographic coordinate
/// under a screen pixel.
pub fn pixel_to_lon_lat(pixel: &Point, zoom: f64, center: &LatLng, size: &Point) -> LatLng {
    let world = world_size(zoom);
    let c = world_pixel(center.lng, center.lat, zoom);

    let world_x = c.x + (pixel.x - size.x / 2.0);
    let world_y = c.y + (pixel.y - size.y / 2.0);

    let lng = (world_x / world) * 360.0 - 180.0;
    let lat = (2.0 * ((world / 2.0 - world_y) * 2.0 * PI / world).exp().atan() - PI / 2.0)
        * 180.0
        / PI;

    LatLng::new(lat, lng)
}

/// Converts a screen-pixel delta into the geographic delta that pans the
/// center by the same visual amount. Drag, inertia and wheel recentering all
/// use this conversion.
pub fn pixel_delta_to_geo(delta: &Point, zoom: f64) -> LatLng {
    let scale = 2_f64.powf(zoom);
    let lat = -delta.y * 180.0 / (TILE_SIZE * scale);
    let lng = -delta.x * 360.0 / (TILE_SIZE * scale);

    LatLng::new(lat, lng)
}

/// Degrees of longitude spanned by one screen pixel at a zoom level. Used to
/// convert pixel tolerances (hover radius) into geographic ones.
pub fn lng_degrees_per_pixel(zoom: f64) -> f64 {
    360.0 / world_size(zoom)
}
