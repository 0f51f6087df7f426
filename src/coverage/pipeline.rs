use ahash::{AHashMap, AHashSet};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{ImageDetail, ImageryApi};
use crate::coverage::{year_category, CoverageFeature, CoverageFilter, Legend};
use crate::tile::RawFeature;

/// Which path produced a coverage result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Geometry only, no remote detail calls.
    Fast,
    /// Details fetched and predicates applied.
    Detail,
}

/// Filtered turbo coverage, ready for symbolization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageResult {
    pub mode: LoadMode,
    pub features: Vec<CoverageFeature>,
    /// Present when coloring by date. May be empty; an empty legend clears the shown one.
    pub legend: Option<Legend>,
    /// Whether the host should attach interactive detail popups.
    pub popups_enabled: bool,
}

impl CoverageResult {
    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }
}

/// Per-image details gathered for one refresh.
#[derive(Debug, Clone, Default)]
pub struct DetailSet {
    pub details: AHashMap<String, ImageDetail>,
    /// Ids whose batch failed; they are left out of the result.
    pub failed: AHashSet<String>,
}

/// Fetch details for `ids` in batches of `batch_size`, all batches concurrently.
/// A failed batch is logged and its ids are marked failed.
pub async fn fetch_details<A: ImageryApi>(api: &A, ids: &[String], batch_size: usize) -> DetailSet {
    let batches: Vec<&[String]> = ids.chunks(batch_size.max(1)).collect();
    let responses = join_all(batches.iter().map(|batch| api.image_details(batch))).await;

    let mut set = DetailSet::default();
    for (batch, response) in batches.iter().zip(responses) {
        match response {
            Ok(details) => set.details.extend(details.into_iter().map(|d| (d.id.clone(), d))),
            Err(err) => {
                warn!(batch = batch.len(), error = %err, "detail batch failed, skipping");
                set.failed.extend(batch.iter().cloned());
            }
        }
    }
    set
}

/// Apply `filter` to decoded features using previously fetched details.
///
/// Pure: the same inputs always produce the same result. Features without
/// geometry or from a failed batch are dropped.
pub fn apply_filters(filter: &CoverageFilter, raw: &[RawFeature], details: &DetailSet) -> CoverageResult {
    let features: Vec<CoverageFeature> = raw.iter()
        .filter(|f| f.has_geometry() && !details.failed.contains(&f.id))
        .filter_map(|f| {
            let detail = details.details.get(&f.id);
            if !filter.matches(detail) { return None }

            let mut feature = CoverageFeature::bare(f);
            if let Some(d) = detail {
                feature.creator_username = d.creator_username.clone();
                feature.sequence_id = d.sequence_id.clone();
                feature.captured_at = d.captured_at;
                feature.is_pano = d.is_pano;
            }
            if filter.color_by_date {
                feature.year_category = Some(year_category(feature.captured_at));
            }
            Some(feature)
        })
        .collect();

    let legend = filter.color_by_date.then(|| {
        Legend::from_years(features.iter().filter_map(|f| f.year_category.as_deref()))
    });

    CoverageResult {
        mode: LoadMode::Detail,
        popups_enabled: filter.popups_enabled() && !features.is_empty(),
        features,
        legend,
    }
}

/// Turn decoded coverage points into the filtered layer.
///
/// Without any predicate this is the fast path: one geometry-only feature per
/// point and no remote calls. Otherwise details are fetched in batches and the
/// predicates applied.
pub async fn filter_coverage<A: ImageryApi>(
    api: &A,
    raw: &[RawFeature],
    filter: &CoverageFilter,
    batch_size: usize,
) -> CoverageResult {
    if !filter.needs_detail() {
        let features: Vec<CoverageFeature> = raw.iter().map(CoverageFeature::bare).collect();
        debug!(features = features.len(), "coverage fast path");
        return CoverageResult { mode: LoadMode::Fast, popups_enabled: !features.is_empty(), features, legend: None };
    }

    let ids: Vec<String> = raw.iter().filter(|f| f.has_geometry()).map(|f| f.id.clone()).collect();
    let details = fetch_details(api, &ids, batch_size).await;
    let result = apply_filters(filter, raw, &details);
    debug!(
        candidates = raw.len(),
        features = result.features.len(),
        failed = details.failed.len(),
        "coverage detail path"
    );
    result
}
