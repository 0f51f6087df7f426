use std::{collections::BTreeMap, io::Read};

use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use geo::Coord;
use mvt_reader::{feature::Value, Reader};
use serde::{Deserialize, Serialize};

use crate::geom::{lat_to_mercator_y, lon_to_mercator_x, mercator_x_to_lon, mercator_y_to_lat, SpatialReference};
use crate::tile::TileIndex;

/// Coordinate extent of tile-local geometry.
pub const TILE_EXTENT: f64 = 4096.0;

/// A decoded tag value of a vector-tile feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self { Self::String(s) => Some(s), _ => None }
    }

    /// Identifier form: strings as-is, integers in decimal.
    pub fn to_id(&self) -> Option<String> {
        match self {
            Self::String(s) if !s.is_empty() => Some(s.clone()),
            Self::Int(v) => Some(v.to_string()),
            Self::Float(v) if v.fract() == 0.0 => Some((*v as i64).to_string()),
            _ => None,
        }
    }
}

impl PropertyValue {
    fn from_mvt(value: &Value) -> Option<Self> {
        Some(match value {
            Value::String(s) => Self::String(s.clone()),
            Value::Float(v) => Self::Float(*v as f64),
            Value::Double(v) => Self::Float(*v),
            Value::Int(v) | Value::SInt(v) => Self::Int(*v),
            Value::UInt(v) => Self::Int(i64::try_from(*v).ok()?),
            Value::Bool(b) => Self::Bool(*b),
            _ => return None,
        })
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

/// A point feature decoded from one tile layer, before deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    /// Position in the map's working spatial reference.
    pub position: Coord<f64>,
    pub properties: Properties,
}

impl RawFeature {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> { self.properties.get(key) }

    /// False for non-finite positions and the `(0, 0)` placeholder.
    pub fn has_geometry(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && !(self.lon == 0.0 && self.lat == 0.0)
    }
}

/// Get tile bounds in Web Mercator coordinates (radians)
fn tile_bounds(tile: TileIndex) -> (f64, f64, f64, f64) {
    let bounds = tile.bounds();
    (
        lon_to_mercator_x(bounds.min_lon),
        lat_to_mercator_y(bounds.min_lat),
        lon_to_mercator_x(bounds.max_lon),
        lat_to_mercator_y(bounds.max_lat),
    )
}

/// Convert a tile-local point `(px, py)` into `(lon, lat)`.
pub fn tile_point_to_lonlat(tile: TileIndex, extent: f64, px: f64, py: f64) -> (f64, f64) {
    let (min_x, min_y, max_x, max_y) = tile_bounds(tile);
    let merc_x = min_x + (px / extent) * (max_x - min_x);
    let merc_y = max_y - (py / extent) * (max_y - min_y); // Y is flipped (down)
    (mercator_x_to_lon(merc_x), mercator_y_to_lat(merc_y))
}

/// Inflate gzip payloads; other payloads pass through.
fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).context("inflate gzip tile")?;
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Decode the point features of sub-layer `layer` from one tile payload.
///
/// A tile without that layer yields an empty list. Features without an id
/// (neither an `id` tag nor a feature id) and non-point geometries are skipped.
pub fn decode_layer(bytes: &[u8], tile: TileIndex, layer: &str, sr: SpatialReference) -> Result<Vec<RawFeature>> {
    let reader = Reader::new(inflate(bytes)?)
        .map_err(|e| anyhow!("decode tile {tile}: {e:?}"))?;
    let names = reader.get_layer_names()
        .map_err(|e| anyhow!("read layers of tile {tile}: {e:?}"))?;

    let Some(layer_idx) = names.iter().position(|name| name == layer) else {
        return Ok(Vec::new());
    };

    let features = reader.get_features(layer_idx)
        .map_err(|e| anyhow!("read layer {layer} of tile {tile}: {e:?}"))?;

    let decoded = features.iter()
        .filter_map(|feature| {
            let point = match feature.get_geometry() {
                geo_types::Geometry::Point(p) => *p,
                geo_types::Geometry::MultiPoint(mp) => *mp.0.first()?,
                _ => return None,
            };

            let properties: Properties = feature.properties.iter()
                .flatten()
                .filter_map(|(k, v)| Some((k.clone(), PropertyValue::from_mvt(v)?)))
                .collect();

            let id = properties.get("id").and_then(PropertyValue::to_id)
                .or_else(|| feature.id.map(|id| id.to_string()))?;

            let (lon, lat) = tile_point_to_lonlat(tile, TILE_EXTENT, point.x() as f64, point.y() as f64);
            Some(RawFeature { id, lon, lat, position: sr.project(lon, lat), properties })
        })
        .collect();

    Ok(decoded)
}
