use crate::core::geo::TileCoord;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Dark basemap served from four interchangeable edge endpoints. The
/// endpoint for a tile is a pure function of its coordinates, so repeated
/// requests for the same tile always hit the same host.
pub struct DarkBasemapSource {
    endpoints: Vec<&'static str>,
}

impl DarkBasemapSource {
    pub fn new() -> Self {
        Self {
            endpoints: vec![
                "https://cartodb-basemaps-a.global.ssl.fastly.net/dark_all",
                "https://cartodb-basemaps-b.global.ssl.fastly.net/dark_all",
                "https://cartodb-basemaps-c.global.ssl.fastly.net/dark_all",
                "https://cartodb-basemaps-d.global.ssl.fastly.net/dark_all",
            ],
        }
    }
}

impl Default for DarkBasemapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for DarkBasemapSource {
    fn url(&self, coord: TileCoord) -> String {
        let idx = ((coord.x as u64 + coord.y as u64) % self.endpoints.len() as u64) as usize;
        format!(
            "{}/{}/{}/{}.png",
            self.endpoints[idx], coord.z, coord.x, coord.y
        )
    }
}
