use std::collections::BTreeSet;

use serde::Serialize;

use crate::color::{year_color, Rgb, UNKNOWN_COLOR};
use crate::coverage::UNKNOWN_YEAR;

/// One year → color entry of the color-by-date legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub year: String,
    pub color: Rgb,
}

/// Year → color mapping for the categorical renderer, oldest first.
/// The unknown bucket is never listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    /// Build from the year categories seen in a refresh.
    pub fn from_years<'a>(years: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = years.into_iter()
            .filter(|y| *y != UNKNOWN_YEAR)
            .collect();
        let count = distinct.len();
        Self {
            entries: distinct.into_iter().enumerate()
                .map(|(rank, year)| LegendEntry { year: year.to_string(), color: year_color(rank, count) })
                .collect(),
        }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Renderer color for a year category; unknown and unlisted years share a gray.
    pub fn color_for(&self, year: &str) -> Rgb {
        self.entries.iter()
            .find(|e| e.year == year)
            .map_or(UNKNOWN_COLOR, |e| e.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_sorted_without_unknown() {
        let legend = Legend::from_years(["2021", "unknown", "2019", "2021"]);
        let years: Vec<_> = legend.entries.iter().map(|e| e.year.as_str()).collect();
        assert_eq!(years, ["2019", "2021"]);
        assert_eq!(legend.color_for("unknown"), UNKNOWN_COLOR);
        assert_ne!(legend.color_for("2019"), legend.color_for("2021"));
    }

    #[test]
    fn only_unknown_is_empty() {
        assert!(Legend::from_years(["unknown"]).is_empty());
    }
}
