//! Spatial index over track fixes for pointer hit-testing.
//!
//! Hover detection asks "which trajectory has a fix near the pointer"; an
//! R-tree over every fix answers that in logarithmic time instead of
//! scanning all trajectories per pointer-move.

use crate::core::geo::LatLng;
use crate::track::Trajectory;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// One indexed fix: geographic position plus the owning trajectory.
#[derive(Debug, Clone, PartialEq)]
struct IndexedFix {
    /// `[lng, lat]` in degrees.
    position: [f64; 2],
    track_id: String,
}

impl RTreeObject for IndexedFix {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedFix {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree of every fix of every trajectory on display.
#[derive(Debug, Default)]
pub struct TrackIndex {
    rtree: RTree<IndexedFix>,
}

impl TrackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-build the index from the current detection set.
    pub fn build(trajectories: &[Trajectory]) -> Self {
        let fixes: Vec<IndexedFix> = trajectories
            .iter()
            .flat_map(|t| {
                t.points.iter().map(|p| IndexedFix {
                    position: [p.lng, p.lat],
                    track_id: t.id.clone(),
                })
            })
            .collect();

        Self {
            rtree: RTree::bulk_load(fixes),
        }
    }

    /// Id of the trajectory with the nearest fix within `radius_deg`
    /// degrees of the query point, if any.
    pub fn nearest_within(&self, geo: &LatLng, radius_deg: f64) -> Option<&str> {
        let query = [geo.lng, geo.lat];
        self.rtree
            .nearest_neighbor(&query)
            .filter(|fix| fix.distance_2(&query) <= radius_deg * radius_deg)
            .map(|fix| fix.track_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}
