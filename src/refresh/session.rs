use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::coverage::{CoverageFilter, CoverageKind, CoverageLayer};
use crate::sequence::SequenceCache;

/// Lifecycle of one coverage kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    #[default]
    Inactive,
    /// Enabled but nothing applied for the current viewport (zoomed out or loading).
    ActiveWaiting,
    ActiveLoaded,
}

/// One refresh attempt. Cancelling it makes any result it produces irrelevant.
#[derive(Debug, Clone)]
pub struct RefreshCycle {
    pub kind: CoverageKind,
    pub generation: u64,
    token: CancellationToken,
}

impl RefreshCycle {
    #[inline] pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

    /// Resolves once the cycle is cancelled.
    pub async fn cancelled(&self) { self.token.cancelled().await }

    pub(crate) fn cancel(&self) { self.token.cancel() }
}

#[derive(Debug, Default)]
pub(crate) struct KindState {
    pub(crate) active: bool,
    pub(crate) state: RefreshState,
    pub(crate) cycle: Option<RefreshCycle>,
    pub(crate) generation: u64,
    pub(crate) warning_shown: bool,
}

impl KindState {
    /// Cancel the pending cycle, if any.
    pub(crate) fn cancel_cycle(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.cancel();
        }
    }

    /// Cancel the pending cycle and start the next one.
    pub(crate) fn start_cycle(&mut self, kind: CoverageKind) -> RefreshCycle {
        self.cancel_cycle();
        self.generation += 1;
        let cycle = RefreshCycle { kind, generation: self.generation, token: CancellationToken::new() };
        self.cycle = Some(cycle.clone());
        cycle
    }

    /// Whether `cycle` is still the one this kind is waiting on.
    pub(crate) fn is_current(&self, cycle: &RefreshCycle) -> bool {
        !cycle.is_cancelled() && self.cycle.as_ref().is_some_and(|c| c.generation == cycle.generation)
    }
}

/// Refresh bookkeeping for one coverage kind.
#[derive(Debug)]
pub struct CoverageSession {
    kind: CoverageKind,
    inner: Mutex<KindState>,
}

impl CoverageSession {
    fn new(kind: CoverageKind) -> Self {
        Self { kind, inner: Mutex::new(KindState::default()) }
    }

    #[inline] pub fn kind(&self) -> CoverageKind { self.kind }

    pub fn is_active(&self) -> bool { self.lock().active }

    pub fn state(&self) -> RefreshState { self.lock().state }

    pub(crate) fn lock(&self) -> MutexGuard<'_, KindState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything that lives for one map session: per-kind refresh state, the latest
/// map zoom, the coverage filter, the shown turbo points and the sequence cache.
#[derive(Debug)]
pub struct MapSession {
    signs: CoverageSession,
    objects: CoverageSession,
    turbo: CoverageSession,
    zoom: Mutex<f64>,
    filter: Mutex<CoverageFilter>,
    turbo_layer: Mutex<CoverageLayer>,
    cache: SequenceCache,
}

impl Default for MapSession {
    fn default() -> Self { Self::new() }
}

impl MapSession {
    pub fn new() -> Self {
        Self {
            signs: CoverageSession::new(CoverageKind::Signs),
            objects: CoverageSession::new(CoverageKind::Objects),
            turbo: CoverageSession::new(CoverageKind::Turbo),
            zoom: Mutex::new(0.0),
            filter: Mutex::new(CoverageFilter::default()),
            turbo_layer: Mutex::new(CoverageLayer::default()),
            cache: SequenceCache::new(),
        }
    }

    pub fn coverage(&self, kind: CoverageKind) -> &CoverageSession {
        match kind {
            CoverageKind::Signs => &self.signs,
            CoverageKind::Objects => &self.objects,
            CoverageKind::Turbo => &self.turbo,
        }
    }

    /// Turbo mode: the image coverage layer is enabled.
    pub fn turbo_mode(&self) -> bool { self.turbo.is_active() }

    pub fn zoom(&self) -> f64 { *self.zoom.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn set_zoom(&self, zoom: f64) {
        *self.zoom.lock().unwrap_or_else(PoisonError::into_inner) = zoom;
    }

    pub fn filter(&self) -> CoverageFilter {
        self.filter.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_filter(&self, filter: CoverageFilter) {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = filter;
    }

    /// Run `f` against the currently shown turbo points.
    pub fn with_turbo_layer<R>(&self, f: impl FnOnce(&mut CoverageLayer) -> R) -> R {
        f(&mut self.turbo_layer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn replace_turbo_layer(&self, layer: CoverageLayer) {
        *self.turbo_layer.lock().unwrap_or_else(PoisonError::into_inner) = layer;
    }

    #[inline] pub fn cache(&self) -> &SequenceCache { &self.cache }
}
