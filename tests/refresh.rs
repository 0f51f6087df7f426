mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{TimeZone, Utc};
use imagery_coverage::{
    api::{MemApi, MemImage, SequenceImage},
    coverage::{CoverageFilter, CoverageKind},
    tile::{MemTiles, TileIndex},
    Engine, LayerData, LayerSink, MapSession, Notifier, RefreshOutcome, RefreshState, Scheduler, Viewport,
};

use common::{config, inner_bbox, lonlat, point_tile, Event, Recorder, SIGNS_TEMPLATE, TURBO_TEMPLATE};

const TILE_A: TileIndex = TileIndex { x: 8800, y: 5373, z: 14 };
const TILE_B: TileIndex = TileIndex { x: 8810, y: 5373, z: 14 };

fn tiles() -> MemTiles {
    let mut tiles = MemTiles::new();
    tiles.insert(TURBO_TEMPLATE, TILE_A, point_tile("image", &[("a1", 2048.0, 2048.0)]));
    tiles.insert(TURBO_TEMPLATE, TILE_B, point_tile("image", &[("b1", 2048.0, 2048.0), ("b2", 1024.0, 1024.0)]));
    tiles.insert(SIGNS_TEMPLATE, TILE_A, point_tile("traffic_sign", &[("s1", 2000.0, 2000.0)]));
    tiles
}

fn scheduler(tiles: MemTiles, api: MemApi) -> (Scheduler<MemTiles, MemApi>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let engine = Arc::new(Engine::new(config(), tiles, api));
    let scheduler = Scheduler::new(engine, Arc::new(MapSession::new()), recorder.clone(), recorder.clone());
    (scheduler, recorder)
}

fn view(tile: TileIndex, zoom: f64) -> Viewport { Viewport::new(inner_bbox(tile), zoom) }

#[tokio::test(start_paused = true)]
async fn enabling_at_zoom_loads_fast_path_coverage() {
    let (scheduler, recorder) = scheduler(tiles(), MemApi::new());

    let outcome = scheduler.set_active(CoverageKind::Turbo, true, view(TILE_B, 17.0)).await;

    assert_eq!(outcome, RefreshOutcome::Applied { features: 2 });
    assert_eq!(scheduler.session().coverage(CoverageKind::Turbo).state(), RefreshState::ActiveLoaded);
    assert_eq!(recorder.shown(), vec![Event::Show {
        kind: CoverageKind::Turbo,
        ids: vec!["b1".into(), "b2".into()],
        legend: None,
        popups: true,
    }]);
    assert_eq!(scheduler.session().with_turbo_layer(|layer| layer.len()), 2);
}

#[tokio::test(start_paused = true)]
async fn enabling_below_threshold_warns_instead_of_querying() {
    let tiles = tiles();
    let (scheduler, recorder) = scheduler(tiles, MemApi::new());

    let outcome = scheduler.set_active(CoverageKind::Signs, true, view(TILE_A, 12.0)).await;

    assert_eq!(outcome, RefreshOutcome::BelowMinZoom);
    assert_eq!(scheduler.session().coverage(CoverageKind::Signs).state(), RefreshState::ActiveWaiting);
    assert_eq!(recorder.events(), vec![Event::Warn(CoverageKind::Signs)]);

    // Zooming in dismisses the warning and loads.
    let outcomes = scheduler.viewport_stationary(view(TILE_A, 16.0)).await;
    assert_eq!(outcomes, vec![(CoverageKind::Signs, RefreshOutcome::Applied { features: 1 })]);
    assert_eq!(recorder.events()[1], Event::Dismiss(CoverageKind::Signs));
}

#[tokio::test(start_paused = true)]
async fn warning_is_shown_once_while_zoomed_out() {
    let (scheduler, recorder) = scheduler(tiles(), MemApi::new());
    scheduler.set_active(CoverageKind::Signs, true, view(TILE_A, 12.0)).await;
    scheduler.viewport_moving(11.0);
    scheduler.viewport_stationary(view(TILE_A, 10.0)).await;

    let warnings = recorder.events().into_iter().filter(|e| matches!(e, Event::Warn(_))).count();
    assert_eq!(warnings, 1);
}

#[tokio::test(start_paused = true)]
async fn zooming_out_cancels_and_only_the_newer_cycle_applies() {
    let tiles = tiles().with_delay(Duration::from_millis(1000));
    let (scheduler, recorder) = scheduler(tiles, MemApi::new());

    let (a, b) = tokio::join!(
        scheduler.set_active(CoverageKind::Turbo, true, view(TILE_A, 16.0)),
        async {
            // Cycle A is past its debounce and waiting on tiles.
            tokio::time::sleep(Duration::from_millis(800)).await;
            scheduler.viewport_moving(12.0);
            tokio::time::sleep(Duration::from_millis(100)).await;
            scheduler.viewport_stationary(view(TILE_B, 16.0)).await
        }
    );

    assert_eq!(a, RefreshOutcome::Superseded);
    assert_eq!(b, vec![(CoverageKind::Turbo, RefreshOutcome::Applied { features: 2 })]);
    let shown = recorder.shown();
    assert_eq!(shown.len(), 1);
    assert!(matches!(&shown[0], Event::Show { ids, .. } if ids == &["b1", "b2"]));
}

#[tokio::test(start_paused = true)]
async fn rapid_stationary_events_collapse_to_the_last() {
    let (scheduler, recorder) = scheduler(tiles(), MemApi::new());
    scheduler.set_active(CoverageKind::Turbo, true, view(TILE_A, 16.0)).await;

    let (first, second) = tokio::join!(
        scheduler.viewport_stationary(view(TILE_A, 16.0)),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            scheduler.viewport_stationary(view(TILE_B, 16.0)).await
        }
    );

    assert_eq!(first, vec![(CoverageKind::Turbo, RefreshOutcome::Superseded)]);
    assert_eq!(second, vec![(CoverageKind::Turbo, RefreshOutcome::Applied { features: 2 })]);
    assert_eq!(recorder.shown().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn disabling_mid_load_discards_the_result_and_clears() {
    let tiles = tiles().with_delay(Duration::from_millis(1000));
    let (scheduler, recorder) = scheduler(tiles, MemApi::new());

    let (outcome, _) = tokio::join!(
        scheduler.set_active(CoverageKind::Turbo, true, view(TILE_A, 16.0)),
        async {
            tokio::time::sleep(Duration::from_millis(900)).await;
            scheduler.set_active(CoverageKind::Turbo, false, view(TILE_A, 16.0)).await
        }
    );

    assert_eq!(outcome, RefreshOutcome::Superseded);
    assert!(recorder.shown().is_empty());
    assert_eq!(recorder.events(), vec![Event::Clear(CoverageKind::Turbo)]);
    assert_eq!(scheduler.session().coverage(CoverageKind::Turbo).state(), RefreshState::Inactive);
}

#[tokio::test(start_paused = true)]
async fn zoom_drop_clears_a_loaded_layer_but_keeps_the_sequence_cache() {
    let (scheduler, recorder) = scheduler(tiles(), MemApi::new());
    scheduler.set_active(CoverageKind::Turbo, true, view(TILE_A, 16.0)).await;
    scheduler.session().cache().insert("seq", Vec::<SequenceImage>::new());

    scheduler.viewport_moving(14.0);

    assert_eq!(scheduler.session().coverage(CoverageKind::Turbo).state(), RefreshState::ActiveWaiting);
    assert!(scheduler.session().coverage(CoverageKind::Turbo).is_active());
    assert!(scheduler.session().with_turbo_layer(|layer| layer.is_empty()));
    assert!(scheduler.session().cache().contains("seq"));
    let tail = &recorder.events()[1..];
    assert_eq!(tail, &[Event::Clear(CoverageKind::Turbo), Event::Warn(CoverageKind::Turbo)]);
}

#[tokio::test(start_paused = true)]
async fn creator_filter_without_matches_clears_data_and_legend() {
    let mut api = MemApi::new();
    let captured = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).single();
    for id in ["b1", "b2"] {
        let (lon, lat) = lonlat(TILE_B, 2048.0, 2048.0);
        api.insert(id, MemImage { lon, lat, creator_username: Some("bob".into()), captured_at: captured, ..Default::default() });
    }
    let (scheduler, recorder) = scheduler(tiles(), api);

    let filter = CoverageFilter { creator: Some("alice".into()), color_by_date: true, ..Default::default() };
    assert_eq!(scheduler.set_filter(filter, view(TILE_B, 16.0)).await, None);
    let outcome = scheduler.set_active(CoverageKind::Turbo, true, view(TILE_B, 16.0)).await;

    assert_eq!(outcome, RefreshOutcome::Empty);
    assert_eq!(recorder.shown(), vec![Event::Show {
        kind: CoverageKind::Turbo,
        ids: vec![],
        legend: Some(vec![]),
        popups: false,
    }]);
    assert_eq!(recorder.infos(), vec!["No imagery coverage found in this area".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn changing_the_filter_refreshes_turbo() {
    let mut api = MemApi::new();
    let (lon, lat) = lonlat(TILE_B, 2048.0, 2048.0);
    api.insert("b1", MemImage { lon, lat, creator_username: Some("alice".into()), ..Default::default() });
    api.insert("b2", MemImage { lon, lat, creator_username: Some("bob".into()), ..Default::default() });
    let (scheduler, recorder) = scheduler(tiles(), api);
    scheduler.set_active(CoverageKind::Turbo, true, view(TILE_B, 16.0)).await;

    let filter = CoverageFilter { creator: Some(" alice ".into()), ..Default::default() };
    let outcome = scheduler.set_filter(filter, view(TILE_B, 16.0)).await;

    assert_eq!(outcome, Some(RefreshOutcome::Applied { features: 1 }));
    let shown = recorder.shown();
    assert!(matches!(&shown[1], Event::Show { ids, popups: true, .. } if ids == &["b1"]));
    let creator = scheduler.session().with_turbo_layer(|layer| layer.get("b1").map(|f| f.creator_username.clone()));
    assert_eq!(creator, Some(Some("alice".to_string())));
}

#[tokio::test(start_paused = true)]
async fn inactive_kinds_are_not_refreshed() {
    let tiles = tiles();
    let (scheduler, recorder) = scheduler(tiles, MemApi::new());
    assert_eq!(scheduler.refresh(CoverageKind::Objects, view(TILE_A, 18.0)).await, RefreshOutcome::Inactive);
    assert!(scheduler.viewport_stationary(view(TILE_A, 18.0)).await.is_empty());
    assert!(recorder.events().is_empty());
}

/// Host that reads the session back from inside every callback.
struct SessionReader {
    session: Arc<MapSession>,
    seen: Mutex<Vec<(CoverageKind, bool, RefreshState)>>,
}

impl SessionReader {
    fn record(&self, kind: CoverageKind) {
        let coverage = self.session.coverage(kind);
        let layer_len = self.session.with_turbo_layer(|layer| layer.len());
        assert!(layer_len <= 2);
        self.seen.lock().unwrap().push((kind, coverage.is_active(), coverage.state()));
    }
}

impl LayerSink for SessionReader {
    fn show(&self, kind: CoverageKind, _data: &LayerData) { self.record(kind) }
    fn clear(&self, kind: CoverageKind) { self.record(kind) }
}

impl Notifier for SessionReader {
    fn warn(&self, kind: CoverageKind, _message: &str) { self.record(kind) }
    fn dismiss(&self, kind: CoverageKind) { self.record(kind) }
    fn info(&self, _message: &str) { self.session.turbo_mode(); }
}

#[tokio::test(start_paused = true)]
async fn host_callbacks_may_read_the_session() {
    let session = Arc::new(MapSession::new());
    let host = Arc::new(SessionReader { session: session.clone(), seen: Mutex::new(Vec::new()) });
    let engine = Arc::new(Engine::new(config(), tiles(), MemApi::new()));
    let scheduler = Scheduler::new(engine, session, host.clone(), host.clone());

    let outcome = scheduler.set_active(CoverageKind::Turbo, true, view(TILE_B, 16.0)).await;
    assert_eq!(outcome, RefreshOutcome::Applied { features: 2 });
    scheduler.viewport_moving(12.0);
    scheduler.viewport_stationary(view(TILE_B, 16.0)).await;
    scheduler.set_active(CoverageKind::Turbo, false, view(TILE_B, 16.0)).await;

    let turbo = CoverageKind::Turbo;
    assert_eq!(host.seen.lock().unwrap().clone(), vec![
        (turbo, true, RefreshState::ActiveLoaded),  // show
        (turbo, true, RefreshState::ActiveWaiting), // clear on zoom out
        (turbo, true, RefreshState::ActiveWaiting), // warn
        (turbo, true, RefreshState::ActiveWaiting), // dismiss on zoom in
        (turbo, true, RefreshState::ActiveLoaded),  // show
        (turbo, false, RefreshState::Inactive),     // clear on disable
    ]);
}
