use std::f64::consts::PI;

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Spherical Mercator radius (EPSG:3857).
const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;

/// Convert longitude to Web Mercator X coordinate (in radians)
#[inline] pub(crate) fn lon_to_mercator_x(lon: f64) -> f64 { lon.to_radians() }

/// Convert latitude to Web Mercator Y coordinate (in radians)
#[inline] pub(crate) fn lat_to_mercator_y(lat: f64) -> f64 { (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() }

/// Convert Web Mercator X to longitude
#[inline] pub(crate) fn mercator_x_to_lon(x: f64) -> f64 { x.to_degrees() }

/// Convert Web Mercator Y to latitude
#[inline] pub(crate) fn mercator_y_to_lat(y: f64) -> f64 { (2.0 * (y.exp().atan() - PI / 4.0)).to_degrees() }

/// The map's working spatial reference. Decoded tile features are reprojected
/// into this reference before they are handed to the rendering host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialReference {
    /// Geographic longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// Spherical Web Mercator in meters (EPSG:3857).
    #[default]
    WebMercator,
}

impl SpatialReference {
    /// Project a geographic coordinate into this reference.
    pub fn project(&self, lon: f64, lat: f64) -> Coord<f64> {
        match self {
            Self::Wgs84 => Coord { x: lon, y: lat },
            Self::WebMercator => {
                let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
                Coord {
                    x: lon_to_mercator_x(lon) * MERCATOR_RADIUS,
                    y: lat_to_mercator_y(lat) * MERCATOR_RADIUS,
                }
            }
        }
    }

    /// Inverse of [`SpatialReference::project`], returning `(lon, lat)`.
    pub fn unproject(&self, coord: Coord<f64>) -> (f64, f64) {
        match self {
            Self::Wgs84 => (coord.x, coord.y),
            Self::WebMercator => (
                mercator_x_to_lon(coord.x / MERCATOR_RADIUS),
                mercator_y_to_lat(coord.y / MERCATOR_RADIUS),
            ),
        }
    }
}
