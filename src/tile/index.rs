use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geom::{BBox, MAX_MERCATOR_LAT};

/// Highest zoom level the tile math is defined for.
pub const MAX_ZOOM: u8 = 22;

/// Address of one tile in the global slippy-map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileIndex {
    pub fn new(x: u32, y: u32, z: u8) -> Self { Self { x, y, z } }

    /// Geographic bounds of this tile.
    pub fn bounds(&self) -> BBox {
        let n = tiles_per_axis(self.z);
        let lon = |x: f64| x / n * 360.0 - 180.0;
        let lat = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
        BBox::new(
            lon(self.x as f64),
            lat(self.y as f64 + 1.0),
            lon(self.x as f64 + 1.0),
            lat(self.y as f64),
        )
    }

    /// Expand a `{z}/{x}/{y}` URL template for this tile.
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[inline]
fn tiles_per_axis(zoom: u8) -> f64 { 2.0_f64.powi(zoom as i32) }

/// Web Mercator tile containing `(lon, lat)` at `zoom`.
///
/// Latitude is clamped to the Mercator limit and the result to the grid, so the
/// antimeridian and the poles map onto the last row/column.
pub fn to_tile_index(lon: f64, lat: f64, zoom: u8) -> TileIndex {
    debug_assert!(zoom <= MAX_ZOOM, "zoom {zoom} above {MAX_ZOOM}");
    debug_assert!(lon.is_finite() && lat.is_finite(), "non-finite coordinate");

    let n = tiles_per_axis(zoom);
    let max = n as u32 - 1;
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor().max(0.0) as u32;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor().max(0.0) as u32;

    TileIndex { x: x.min(max), y: y.min(max), z: zoom }
}

fn corners(bbox: &BBox, zoom: u8) -> Option<(TileIndex, TileIndex)> {
    if bbox.is_degenerate() {
        return None;
    }
    Some((to_tile_index(bbox.min_lon, bbox.max_lat, zoom), to_tile_index(bbox.max_lon, bbox.min_lat, zoom)))
}

/// All tiles between the top-left and bottom-right corners of `bbox`, inclusive,
/// enumerated column by column. Empty for a degenerate box.
pub fn tiles_covering_bbox(bbox: &BBox, zoom: u8) -> Vec<TileIndex> {
    let Some((top_left, bottom_right)) = corners(bbox, zoom) else {
        return Vec::new();
    };
    (top_left.x..=bottom_right.x)
        .flat_map(|x| (top_left.y..=bottom_right.y).map(move |y| TileIndex { x, y, z: zoom }))
        .collect()
}

/// Number of tiles [`tiles_covering_bbox`] would return, without enumerating them.
pub fn tile_count(bbox: &BBox, zoom: u8) -> u64 {
    corners(bbox, zoom).map_or(0, |(top_left, bottom_right)| {
        (bottom_right.x - top_left.x + 1) as u64 * (bottom_right.y - top_left.y + 1) as u64
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tile_for_berlin() {
        // Brandenburg Gate at z14.
        assert_eq!(to_tile_index(13.3777, 52.5163, 14), TileIndex::new(8800, 5373, 14));
    }

    #[test]
    fn deterministic() {
        let a = to_tile_index(-73.9857, 40.7484, 17);
        let b = to_tile_index(-73.9857, 40.7484, 17);
        assert_eq!(a, b);
    }

    #[test]
    fn index_is_reproduced_from_own_bounds() {
        for &(lon, lat, z) in &[(0.0, 0.0, 0u8), (13.4, 52.5, 14), (-122.4, 37.8, 16), (151.2, -33.9, 22), (179.99, -84.0, 10)] {
            let tile = to_tile_index(lon, lat, z);
            let (clon, clat) = tile.bounds().center();
            assert_eq!(to_tile_index(clon, clat, z), tile);
        }
    }

    #[test]
    fn poles_and_antimeridian_stay_on_grid() {
        assert_eq!(to_tile_index(180.0, -90.0, 3), TileIndex::new(7, 7, 3));
        assert_eq!(to_tile_index(-180.0, 90.0, 3), TileIndex::new(0, 0, 3));
    }

    #[test]
    fn cover_contains_bbox() {
        let bbox = BBox::new(13.30, 52.48, 13.45, 52.55);
        let tiles = tiles_covering_bbox(&bbox, 14);
        assert!(!tiles.is_empty());
        let cover = tiles.iter().map(TileIndex::bounds).reduce(|a, b| a.union(&b)).unwrap();
        assert!(cover.contains_bbox(&bbox));
    }

    #[test]
    fn cover_is_a_full_rectangle_without_duplicates() {
        let bbox = BBox::new(13.30, 52.48, 13.45, 52.55);
        let tiles = tiles_covering_bbox(&bbox, 14);
        let xs: std::collections::BTreeSet<_> = tiles.iter().map(|t| t.x).collect();
        let ys: std::collections::BTreeSet<_> = tiles.iter().map(|t| t.y).collect();
        assert_eq!(tiles.len(), xs.len() * ys.len());
    }

    #[test]
    fn count_matches_cover_without_enumerating() {
        let bbox = BBox::new(13.30, 52.48, 13.45, 52.55);
        assert_eq!(tile_count(&bbox, 14), tiles_covering_bbox(&bbox, 14).len() as u64);
        let world = BBox::new(-180.0, -90.0, 180.0, 90.0);
        assert_eq!(tile_count(&world, MAX_ZOOM), 1u64 << (2 * MAX_ZOOM as u64));
        assert_eq!(tile_count(&BBox::new(1.0, 0.0, 0.0, 1.0), 14), 0);
    }

    #[test]
    fn inverted_bbox_has_no_tiles() {
        assert!(tiles_covering_bbox(&BBox::new(13.45, 52.48, 13.30, 52.55), 14).is_empty());
        assert!(tiles_covering_bbox(&BBox::new(13.30, 52.55, 13.45, 52.48), 14).is_empty());
    }

    #[test]
    fn template_expansion() {
        let t = TileIndex::new(3, 5, 7);
        assert_eq!(t.fill_template("https://t/{z}/{x}/{y}.mvt"), "https://t/7/3/5.mvt");
    }
}
