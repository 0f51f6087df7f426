use serde::{Deserialize, Serialize};

/// Meters per degree of latitude on the mean-radius sphere.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// A geographic bounding box in degrees, `[min_lon, min_lat, max_lon, max_lat]`.
///
/// Unlike [`geo::Rect`] the corners are stored as given, so an inverted box
/// stays inverted and can be detected with [`BBox::is_degenerate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    #[inline] pub fn to_array(&self) -> [f64; 4] { [self.min_lon, self.min_lat, self.max_lon, self.max_lat] }

    /// A square box of roughly `radius_m` meters around a point.
    /// Longitude span is widened by `1 / cos(lat)` so the box stays square on the ground.
    pub fn around(lon: f64, lat: f64, radius_m: f64) -> Self {
        let dlat = radius_m / METERS_PER_DEGREE;
        let dlon = radius_m / (METERS_PER_DEGREE * lat.to_radians().cos().max(1e-6));
        Self::new(lon - dlon, lat - dlat, lon + dlon, lat + dlat)
    }

    /// True when the box has no area (min ≥ max on either axis) or holds non-finite values.
    pub fn is_degenerate(&self) -> bool {
        !self.to_array().iter().all(|v| v.is_finite())
            || self.min_lon >= self.max_lon
            || self.min_lat >= self.max_lat
    }

    /// Inclusive point containment.
    #[inline]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        self.contains(other.min_lon, other.min_lat) && self.contains(other.max_lon, other.max_lat)
    }

    /// Smallest box covering both inputs.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }

    /// Center point as `(lon, lat)`.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        ((self.min_lon + self.max_lon) / 2.0, (self.min_lat + self.max_lat) / 2.0)
    }

    /// Query-string form `minLon,minLat,maxLon,maxLat`.
    pub fn to_query(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}
