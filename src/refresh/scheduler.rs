use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::api::ImageryApi;
use crate::coverage::{filter_coverage, CoverageFilter, CoverageKind, CoverageLayer, SignFeature};
use crate::engine::Engine;
use crate::geom::BBox;
use crate::host::{LayerData, LayerSink, Notifier};
use crate::refresh::session::{KindState, MapSession, RefreshCycle, RefreshState};
use crate::tile::{fetch_layer, LayerQuery, TileSource};

/// What the map currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub bbox: BBox,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bbox: BBox, zoom: f64) -> Self { Self { bbox, zoom } }
}

/// How one refresh request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The layer is disabled.
    Inactive,
    /// The map zoom is below the interactivity threshold.
    BelowMinZoom,
    /// A newer event cancelled this cycle before its result existed.
    Superseded,
    /// The result arrived but was no longer wanted.
    Discarded,
    /// Applied, with nothing to show.
    Empty,
    Applied { features: usize },
}

/// A host callback decided while a kind lock was held.
enum HostCall {
    Show(LayerData),
    Clear,
    Warn(String),
    Dismiss,
    Info(String),
}

/// Drives coverage layer refreshes from map events.
///
/// Each enabled kind has at most one live [`RefreshCycle`]. A cycle waits out the
/// debounce period, loads, and applies its result only if it is still current,
/// the layer is still enabled and the zoom is still at or above the threshold.
pub struct Scheduler<T, A> {
    engine: Arc<Engine<T, A>>,
    session: Arc<MapSession>,
    sink: Arc<dyn LayerSink>,
    notifier: Arc<dyn Notifier>,
}

impl<T: TileSource, A: ImageryApi> Scheduler<T, A> {
    pub fn new(
        engine: Arc<Engine<T, A>>,
        session: Arc<MapSession>,
        sink: Arc<dyn LayerSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { engine, session, sink, notifier }
    }

    #[inline] pub fn session(&self) -> &Arc<MapSession> { &self.session }

    /// Enable or disable a coverage kind. Enabling refreshes it for `view`.
    pub async fn set_active(&self, kind: CoverageKind, active: bool, view: Viewport) -> RefreshOutcome {
        if !active {
            self.deactivate(kind);
            return RefreshOutcome::Inactive;
        }
        {
            let mut state = self.session.coverage(kind).lock();
            state.active = true;
            if state.state == RefreshState::Inactive {
                state.state = RefreshState::ActiveWaiting;
            }
        }
        info!(%kind, "coverage layer enabled");
        self.refresh(kind, view).await
    }

    fn deactivate(&self, kind: CoverageKind) {
        let calls = {
            let mut state = self.session.coverage(kind).lock();
            state.cancel_cycle();
            state.active = false;
            state.state = RefreshState::Inactive;
            let mut calls = Vec::new();
            if state.warning_shown {
                state.warning_shown = false;
                calls.push(HostCall::Dismiss);
            }
            calls.push(self.clear_layer(kind));
            calls
        };
        self.run(kind, calls);
        info!(%kind, "coverage layer disabled");
    }

    /// The map is moving. Pending cycles are cancelled at once; below the
    /// threshold the enabled layers are also cleared and the warning shown.
    pub fn viewport_moving(&self, zoom: f64) {
        self.session.set_zoom(zoom);
        for kind in CoverageKind::ALL {
            let calls = {
                let mut state = self.session.coverage(kind).lock();
                if !state.active {
                    continue;
                }
                state.cancel_cycle();
                if zoom < self.engine.config.min_zoom {
                    self.enter_waiting(kind, &mut state)
                } else {
                    Vec::new()
                }
            };
            self.run(kind, calls);
        }
    }

    /// The map stopped moving: refresh every enabled kind for `view`.
    pub async fn viewport_stationary(&self, view: Viewport) -> Vec<(CoverageKind, RefreshOutcome)> {
        self.session.set_zoom(view.zoom);
        let kinds: Vec<CoverageKind> =
            CoverageKind::ALL.into_iter().filter(|&kind| self.session.coverage(kind).is_active()).collect();
        let outcomes = join_all(kinds.iter().map(|&kind| self.refresh(kind, view))).await;
        kinds.into_iter().zip(outcomes).collect()
    }

    /// Replace the coverage filter; refreshes the turbo layer when it is enabled.
    pub async fn set_filter(&self, filter: CoverageFilter, view: Viewport) -> Option<RefreshOutcome> {
        self.session.set_filter(filter);
        if !self.session.turbo_mode() {
            return None;
        }
        Some(self.refresh(CoverageKind::Turbo, view).await)
    }

    /// Start a refresh cycle for `kind`, superseding any pending one.
    #[instrument(level = "debug", skip(self, view), fields(zoom = view.zoom))]
    pub async fn refresh(&self, kind: CoverageKind, view: Viewport) -> RefreshOutcome {
        self.session.set_zoom(view.zoom);
        let started = {
            let mut state = self.session.coverage(kind).lock();
            if !state.active {
                return RefreshOutcome::Inactive;
            }
            state.cancel_cycle();
            if view.zoom < self.engine.config.min_zoom {
                Err(self.enter_waiting(kind, &mut state))
            } else {
                let mut calls = Vec::new();
                if state.warning_shown {
                    state.warning_shown = false;
                    calls.push(HostCall::Dismiss);
                }
                Ok((state.start_cycle(kind), calls))
            }
        };
        let cycle = match started {
            Ok((cycle, calls)) => {
                self.run(kind, calls);
                cycle
            }
            Err(calls) => {
                self.run(kind, calls);
                return RefreshOutcome::BelowMinZoom;
            }
        };

        tokio::select! {
            _ = cycle.cancelled() => {
                debug!(generation = cycle.generation, "cycle superseded during debounce");
                return RefreshOutcome::Superseded;
            }
            _ = tokio::time::sleep(self.engine.config.debounce()) => {}
        }

        match self.load(&cycle, &view).await {
            Some(data) => self.apply(&cycle, data),
            None => RefreshOutcome::Superseded,
        }
    }

    async fn load(&self, cycle: &RefreshCycle, view: &Viewport) -> Option<LayerData> {
        let config = &self.engine.config;
        let source = config.layer(cycle.kind);
        let query = LayerQuery {
            template: &source.template,
            layer: &source.layer,
            bbox: view.bbox,
            zoom: config.tile_zoom,
        };
        let raw = fetch_layer(&self.engine.tiles, &query, config.spatial_reference).await;
        if cycle.is_cancelled() {
            debug!(generation = cycle.generation, "cycle superseded after tile fetch");
            return None;
        }

        let data = match cycle.kind {
            CoverageKind::Turbo => {
                let filter = self.session.filter();
                let result = filter_coverage(&self.engine.api, &raw, &filter, config.detail_batch_size).await;
                LayerData::Coverage(result)
            }
            CoverageKind::Signs | CoverageKind::Objects => {
                LayerData::Signs { features: raw.into_iter().map(SignFeature::from).collect() }
            }
        };
        Some(data)
    }

    /// Last-second check under the kind lock, then hand the result to the host.
    fn apply(&self, cycle: &RefreshCycle, data: LayerData) -> RefreshOutcome {
        let kind = cycle.kind;
        {
            let mut state = self.session.coverage(kind).lock();
            let zoom = self.session.zoom();
            if !state.active || !state.is_current(cycle) || zoom < self.engine.config.min_zoom {
                debug!(%kind, generation = cycle.generation, zoom, "discarding stale result");
                return RefreshOutcome::Discarded;
            }
            state.cycle = None;
            state.state = RefreshState::ActiveLoaded;
            if let LayerData::Coverage(result) = &data {
                self.session.replace_turbo_layer(CoverageLayer::new(result.features.clone()));
            }
        }

        let features = data.len();
        info!(%kind, features, generation = cycle.generation, "coverage applied");
        let mut calls = vec![HostCall::Show(data)];
        let outcome = if features == 0 {
            calls.push(HostCall::Info(format!("No {} found in this area", kind.label())));
            RefreshOutcome::Empty
        } else {
            RefreshOutcome::Applied { features }
        };
        self.run(kind, calls);
        outcome
    }

    /// State changes for dropping below the zoom threshold. The returned calls
    /// must run after the kind lock is released.
    fn enter_waiting(&self, kind: CoverageKind, state: &mut KindState) -> Vec<HostCall> {
        let mut calls = Vec::new();
        if state.state == RefreshState::ActiveLoaded {
            calls.push(self.clear_layer(kind));
        }
        state.state = RefreshState::ActiveWaiting;
        if !state.warning_shown {
            state.warning_shown = true;
            calls.push(HostCall::Warn(format!(
                "Zoom in to level {} or closer to see {}",
                self.engine.config.min_zoom,
                kind.label()
            )));
        }
        calls
    }

    fn clear_layer(&self, kind: CoverageKind) -> HostCall {
        if kind == CoverageKind::Turbo {
            self.session.replace_turbo_layer(CoverageLayer::default());
        }
        HostCall::Clear
    }

    /// Hand decided calls to the host. Never called with a session lock held,
    /// so callbacks may read the session.
    fn run(&self, kind: CoverageKind, calls: Vec<HostCall>) {
        for call in calls {
            match call {
                HostCall::Show(data) => self.sink.show(kind, &data),
                HostCall::Clear => self.sink.clear(kind),
                HostCall::Warn(message) => self.notifier.warn(kind, &message),
                HostCall::Dismiss => self.notifier.dismiss(kind),
                HostCall::Info(message) => self.notifier.info(&message),
            }
        }
    }
}
