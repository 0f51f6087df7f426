use std::sync::Arc;

use anyhow::{bail, Result};
use imagery_coverage::{
    coverage::{CoverageFilter, CoverageKind},
    Config, Engine, MapSession, RefreshOutcome, Scheduler, Viewport,
};
use tracing::info;

use crate::cli::CoverageArgs;
use crate::commands::{parse_bbox, LogNotifier, StdoutSink};

pub async fn run(config: Config, args: &CoverageArgs) -> Result<()> {
    let view = Viewport::new(parse_bbox(&args.bbox)?, args.map_zoom);
    let kind = CoverageKind::from(args.kind);
    let min_zoom = config.min_zoom;

    let engine = Arc::new(Engine::connect(config)?);
    let scheduler = Scheduler::new(engine, Arc::new(MapSession::new()), Arc::new(StdoutSink), Arc::new(LogNotifier));

    let filter = CoverageFilter {
        creator: args.creator.clone(),
        start_date: args.start,
        end_date: args.end,
        pano: args.pano,
        color_by_date: args.color_by_date,
    };
    scheduler.set_filter(filter, view).await;

    match scheduler.set_active(kind, true, view).await {
        RefreshOutcome::BelowMinZoom => bail!("--map-zoom {} is below the minimum of {min_zoom}", view.zoom),
        outcome => info!(%kind, ?outcome, "coverage loaded"),
    }
    Ok(())
}
