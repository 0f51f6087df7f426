use std::fmt;

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::tile::{PropertyValue, RawFeature};

/// The independently refreshed coverage layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageKind {
    /// Traffic-sign points.
    Signs,
    /// Other detected map-object points.
    Objects,
    /// Dense imagery coverage points for turbo browsing.
    Turbo,
}

impl CoverageKind {
    pub const ALL: [CoverageKind; 3] = [Self::Signs, Self::Objects, Self::Turbo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signs => "signs",
            Self::Objects => "objects",
            Self::Turbo => "turbo",
        }
    }

    /// Human-readable name for messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Signs => "traffic signs",
            Self::Objects => "map objects",
            Self::Turbo => "imagery coverage",
        }
    }
}

impl fmt::Display for CoverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A deduplicated imagery point, enriched with details on the detail path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageFeature {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    /// Position in the map's working spatial reference.
    pub position: Coord<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pano: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_category: Option<String>,
}

impl CoverageFeature {
    /// Geometry-only feature, as produced by the fast path.
    pub fn bare(raw: &RawFeature) -> Self {
        Self {
            id: raw.id.clone(),
            lon: raw.lon,
            lat: raw.lat,
            position: raw.position,
            creator_username: None,
            sequence_id: None,
            captured_at: None,
            is_pano: None,
            year_category: None,
        }
    }
}

/// A traffic-sign or map-object point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignFeature {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub position: Coord<f64>,
    /// Classification tag, e.g. "regulatory--stop--g1".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<RawFeature> for SignFeature {
    fn from(raw: RawFeature) -> Self {
        let value = raw.property("value").and_then(PropertyValue::as_str).map(str::to_string);
        Self { id: raw.id, lon: raw.lon, lat: raw.lat, position: raw.position, value }
    }
}
