use ahash::AHashMap;

use crate::coverage::CoverageFeature;
use crate::spatial::PointIndex;

/// The turbo coverage points currently shown on the map, indexed for click lookup.
///
/// Sequence ids resolved lazily on click are written back here, so a second click
/// on the same point needs no lookup.
#[derive(Debug, Clone, Default)]
pub struct CoverageLayer {
    features: Vec<CoverageFeature>,
    by_id: AHashMap<String, usize>,
    index: PointIndex,
}

impl CoverageLayer {
    pub fn new(features: Vec<CoverageFeature>) -> Self {
        let by_id = features.iter().enumerate().map(|(i, f)| (f.id.clone(), i)).collect();
        let index = PointIndex::new(features.iter().map(|f| (f.lon, f.lat)));
        Self { features, by_id, index }
    }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn features(&self) -> &[CoverageFeature] { &self.features }

    pub fn get(&self, id: &str) -> Option<&CoverageFeature> {
        self.by_id.get(id).map(|&i| &self.features[i])
    }

    /// Closest shown point within `tolerance_m` meters of `(lon, lat)`.
    pub fn point_near(&self, lon: f64, lat: f64, tolerance_m: f64) -> Option<&CoverageFeature> {
        self.index.nearest_within(lon, lat, tolerance_m).map(|(i, _)| &self.features[i])
    }

    /// Record the owning sequence of a shown point. Returns false if the point is gone.
    pub fn set_sequence(&mut self, id: &str, sequence_id: &str) -> bool {
        match self.by_id.get(id) {
            Some(&i) => {
                self.features[i].sequence_id = Some(sequence_id.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::Coord;

    use super::*;

    fn feature(id: &str, lon: f64, lat: f64) -> CoverageFeature {
        CoverageFeature {
            id: id.into(), lon, lat, position: Coord { x: lon, y: lat },
            creator_username: None, sequence_id: None, captured_at: None, is_pano: None, year_category: None,
        }
    }

    #[test]
    fn lookup_by_id_and_position() {
        let mut layer = CoverageLayer::new(vec![feature("a", 0.0, 0.0), feature("b", 0.001, 0.0)]);
        assert_eq!(layer.get("b").map(|f| f.lon), Some(0.001));
        assert_eq!(layer.point_near(0.00099, 0.0, 3.0).map(|f| f.id.as_str()), Some("b"));
        assert!(layer.point_near(0.0005, 0.0, 3.0).is_none());

        assert!(layer.set_sequence("a", "s"));
        assert_eq!(layer.get("a").and_then(|f| f.sequence_id.as_deref()), Some("s"));
        assert!(!layer.set_sequence("zzz", "s"));
    }
}
