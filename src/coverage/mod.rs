//! Turbo coverage filtering, year categorization and the shown layer.

mod feature;
mod filter;
mod layer;
mod legend;
mod pipeline;

pub use feature::{CoverageFeature, CoverageKind, SignFeature};
pub use filter::{year_category, CoverageFilter, UNKNOWN_YEAR};
pub use layer::CoverageLayer;
pub use legend::{Legend, LegendEntry};
pub use pipeline::{apply_filters, fetch_details, filter_coverage, CoverageResult, DetailSet, LoadMode};
