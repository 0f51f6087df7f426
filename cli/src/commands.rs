pub mod coverage;
pub mod nearest;
pub mod tiles;

use imagery_coverage::{coverage::CoverageKind, geom::BBox, LayerData, LayerSink, Notifier};
use tracing::{info, warn};

use crate::cli::KindArg;

pub(crate) fn parse_bbox(values: &[f64]) -> anyhow::Result<BBox> {
    let [min_lon, min_lat, max_lon, max_lat] = values else {
        anyhow::bail!("--bbox takes four values: min_lon,min_lat,max_lon,max_lat");
    };
    let bbox = BBox::new(*min_lon, *min_lat, *max_lon, *max_lat);
    anyhow::ensure!(!bbox.is_degenerate(), "empty bounding box {values:?}");
    Ok(bbox)
}

impl From<KindArg> for CoverageKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Signs => CoverageKind::Signs,
            KindArg::Objects => CoverageKind::Objects,
            KindArg::Turbo => CoverageKind::Turbo,
        }
    }
}

/// Writes shown layers to stdout as JSON.
pub(crate) struct StdoutSink;

impl LayerSink for StdoutSink {
    fn show(&self, kind: CoverageKind, data: &LayerData) {
        match serde_json::to_string_pretty(data) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(%kind, error = %err, "failed to serialize layer"),
        }
    }

    fn clear(&self, kind: CoverageKind) {
        info!(%kind, "layer cleared");
    }
}

/// Routes user messages to the log.
pub(crate) struct LogNotifier;

impl Notifier for LogNotifier {
    fn warn(&self, kind: CoverageKind, message: &str) { warn!(%kind, "{message}") }

    fn dismiss(&self, _kind: CoverageKind) {}

    fn info(&self, message: &str) { eprintln!("{message}") }
}
