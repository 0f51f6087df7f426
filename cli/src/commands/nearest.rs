use std::sync::Arc;

use anyhow::Result;
use geo::Point;
use imagery_coverage::{
    api::SequenceImage,
    sequence::{FileSession, MemSession, SessionStore},
    spatial::SequenceSummary,
    ClickDispatcher, Config, Engine, Hit, MapSession, Viewer,
};
use tracing::info;

use crate::cli::NearestArgs;
use crate::commands::LogNotifier;

struct LogViewer;

impl Viewer for LogViewer {
    fn open(&self, sequence_id: &str, image_id: &str) {
        info!(sequence_id, image_id, "open");
    }

    fn draw_route(&self, sequence_id: &str, images: &[SequenceImage]) {
        info!(sequence_id, images = images.len(), "route");
    }

    fn show_candidates(&self, candidates: &[SequenceSummary]) {
        for candidate in candidates {
            info!(
                sequence_id = %candidate.sequence_id,
                color = %candidate.color(),
                distance = candidate.min_distance,
                "candidate"
            );
        }
    }
}

pub async fn run(config: Config, args: &NearestArgs) -> Result<()> {
    let store: Arc<dyn SessionStore> = match &args.session {
        Some(path) => Arc::new(FileSession::new(path)),
        None => Arc::new(MemSession::new()),
    };
    let engine = Arc::new(Engine::connect(config)?);
    let dispatcher = ClickDispatcher::new(engine, Arc::new(MapSession::new()), Arc::new(LogViewer), Arc::new(LogNotifier), store);

    if let Some(restored) = dispatcher.restore() {
        info!(sequence_id = %restored.sequence_id, image_id = %restored.image_id, "previous session");
    }

    let outcome = dispatcher.dispatch(Point::new(args.lon, args.lat), Hit::Background).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
