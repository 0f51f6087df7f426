use rstar::{RTree, RTreeObject, AABB};

use crate::geom::{distance, BBox};

/// A point in the R-tree, associated with a feature by index.
#[derive(Debug, Clone)]
struct IndexedPoint {
    idx: usize, // Index of corresponding feature in the owner's list
    lon: f64,
    lat: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lon, self.lat])
    }
}

/// Spatial index over point features, answering "which point is within
/// `tolerance` meters of this click".
#[derive(Debug, Clone, Default)]
pub struct PointIndex {
    rtree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Build from `(lon, lat)` pairs; results refer back to their position in `points`.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                points.into_iter().enumerate()
                    .filter(|(_, (lon, lat))| lon.is_finite() && lat.is_finite())
                    .map(|(idx, (lon, lat))| IndexedPoint { idx, lon, lat })
                    .collect()
            ),
        }
    }

    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.rtree.size() == 0 }

    /// Index of the closest point within `tolerance_m` meters, with its distance.
    pub fn nearest_within(&self, lon: f64, lat: f64, tolerance_m: f64) -> Option<(usize, f64)> {
        let window = BBox::around(lon, lat, tolerance_m);
        let envelope = AABB::from_corners([window.min_lon, window.min_lat], [window.max_lon, window.max_lat]);

        self.rtree.locate_in_envelope(&envelope)
            .map(|p| (p.idx, distance(lat, lon, p.lat, p.lon)))
            .filter(|&(_, d)| d <= tolerance_m)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }
}
