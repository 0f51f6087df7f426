use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ImageDetail;

/// Year bucket for features whose capture time is unknown or unparsable.
pub const UNKNOWN_YEAR: &str = "unknown";

/// User-selected predicates for the turbo coverage layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageFilter {
    /// Exact, case-sensitive creator username; surrounding whitespace is ignored.
    pub creator: Option<String>,
    /// Inclusive lower bound on the capture date.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the capture date.
    pub end_date: Option<NaiveDate>,
    /// `None` = no filter; otherwise the panorama flag must match.
    pub pano: Option<bool>,
    /// Bucket features by capture year and emit a legend.
    pub color_by_date: bool,
}

impl CoverageFilter {
    /// Trimmed creator filter, `None` when unset or blank.
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether per-image details must be fetched.
    pub fn needs_detail(&self) -> bool {
        self.color_by_date
            || self.creator().is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.pano.is_some()
    }

    /// Interactive popups are worth their extra requests only when the filter
    /// involves creator or date range; a pano/color-only refresh renders categories alone.
    pub fn popups_enabled(&self) -> bool {
        !self.needs_detail()
            || self.creator().is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    fn creator_matches(&self, detail: Option<&ImageDetail>) -> bool {
        match self.creator() {
            None => true,
            Some(creator) => detail.and_then(|d| d.creator_username.as_deref()) == Some(creator),
        }
    }

    /// Date bounds fail open: a feature without a known capture time passes.
    fn date_matches(&self, captured_at: Option<DateTime<Utc>>) -> bool {
        let Some(date) = captured_at.map(|t| t.date_naive()) else { return true };
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }

    /// An image without a panorama flag counts as not a panorama.
    fn pano_matches(&self, detail: Option<&ImageDetail>) -> bool {
        match self.pano {
            None => true,
            Some(want) => detail.and_then(|d| d.is_pano).unwrap_or(false) == want,
        }
    }

    /// Apply every predicate to one feature's details.
    pub fn matches(&self, detail: Option<&ImageDetail>) -> bool {
        self.creator_matches(detail)
            && self.date_matches(detail.and_then(|d| d.captured_at))
            && self.pano_matches(detail)
    }
}

/// Year category of a capture time, or [`UNKNOWN_YEAR`].
pub fn year_category(captured_at: Option<DateTime<Utc>>) -> String {
    captured_at.map_or_else(|| UNKNOWN_YEAR.to_string(), |t| t.year().to_string())
}
