use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One image of a sequence with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceImage {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
}

impl SequenceImage {
    pub fn new(id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self { id: id.into(), lon, lat }
    }

    /// False for non-finite positions and the `(0, 0)` placeholder the API
    /// reports for images without a usable geometry.
    pub fn has_geometry(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && !(self.lon == 0.0 && self.lat == 0.0)
    }
}

/// Per-image metadata used by the detail filtering path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDetail {
    pub id: String,
    pub creator_username: Option<String>,
    pub sequence_id: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub is_pano: Option<bool>,
}

/// An image returned by a bounding-box search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageHit {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub sequence_id: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Capture time as reported by the API: epoch milliseconds or an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    /// Parse into a UTC instant; `None` when the value is unparsable.
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Self::Text(s) => DateTime::parse_from_rfc3339(s).ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| s.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single())),
        }
    }
}
