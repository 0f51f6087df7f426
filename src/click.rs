//! Click resolution: decide what a map click opens.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use geo::Point;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ImageryApi, SequenceImage};
use crate::coverage::CoverageKind;
use crate::engine::Engine;
use crate::geom::{distance, BBox};
use crate::host::{Notifier, Viewer};
use crate::refresh::MapSession;
use crate::sequence::{ActiveSequence, SessionStore};
use crate::spatial::{nearest_global_image, nearest_in_sequence, rank_sequences_by_proximity, summarize_hits};

/// What the host's hit test struck, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    /// A drawn route (markers or polyline) of an opened sequence.
    SequenceOverlay { sequence_id: String },
    /// A sign or object feature; its popup is the host's business.
    FeaturePopup { kind: CoverageKind, feature_id: String },
    /// A shown turbo coverage point.
    CoveragePoint { feature_id: String },
    Background,
}

/// The image the viewer ended up on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenedImage {
    pub sequence_id: String,
    pub image_id: String,
    pub lon: f64,
    pub lat: f64,
    /// Distance from the click, in meters.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    Opened(OpenedImage),
    /// The click was on the active image; nothing changed.
    Reselected,
    /// Handed to the popup collaborator.
    Popup,
    /// Turbo mode click that did not hit a coverage point.
    Rejected,
    NoImagery,
}

/// Resolves clicks to `(sequence, image)` pairs for the viewer.
pub struct ClickDispatcher<T, A> {
    engine: Arc<Engine<T, A>>,
    session: Arc<MapSession>,
    viewer: Arc<dyn Viewer>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn SessionStore>,
    active: Mutex<Option<OpenedImage>>,
}

impl<T, A: ImageryApi> ClickDispatcher<T, A> {
    pub fn new(
        engine: Arc<Engine<T, A>>,
        session: Arc<MapSession>,
        viewer: Arc<dyn Viewer>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self { engine, session, viewer, notifier, store, active: Mutex::new(None) }
    }

    /// Currently opened image, if any.
    pub fn active(&self) -> Option<OpenedImage> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Reopen the sequence saved earlier in this session and seed the cache with it.
    pub fn restore(&self) -> Option<OpenedImage> {
        let saved = self.store.load()?;
        if !self.session.cache().contains(&saved.sequence_id) {
            self.session.cache().insert(&saved.sequence_id, saved.images.clone());
        }
        let image = match saved.image_id.as_deref() {
            Some(id) => saved.images.iter().find(|image| image.id == id),
            None => saved.images.first(),
        }?;
        let opened = OpenedImage {
            sequence_id: saved.sequence_id.clone(),
            image_id: image.id.clone(),
            lon: image.lon,
            lat: image.lat,
            distance: 0.0,
        };
        self.viewer.open(&opened.sequence_id, &opened.image_id);
        self.viewer.draw_route(&opened.sequence_id, &saved.images);
        info!(sequence_id = %opened.sequence_id, image_id = %opened.image_id, "restored active sequence");
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(opened.clone());
        Some(opened)
    }

    /// Hit test against the shown turbo points, for hosts that only report a position.
    pub fn hit_coverage_point(&self, point: Point<f64>) -> Option<Hit> {
        let tolerance = self.engine.config.click_tolerance_m;
        self.session.with_turbo_layer(|layer| {
            layer.point_near(point.x(), point.y(), tolerance)
                .map(|feature| Hit::CoveragePoint { feature_id: feature.id.clone() })
        })
    }

    /// Resolve one click at `point` (x = lon, y = lat) given what the hit test struck.
    pub async fn dispatch(&self, point: Point<f64>, hit: Hit) -> ClickOutcome {
        if !matches!(hit, Hit::FeaturePopup { .. }) && self.is_reselection(point) {
            debug!("click on the active image");
            return ClickOutcome::Reselected;
        }

        let turbo = self.session.turbo_mode();
        match hit {
            Hit::SequenceOverlay { sequence_id } => self.open_nearest_in(point, &sequence_id).await,
            Hit::FeaturePopup { kind, feature_id } => {
                debug!(%kind, feature_id, "delegating to popup");
                ClickOutcome::Popup
            }
            Hit::CoveragePoint { feature_id } if turbo => self.open_coverage_point(point, &feature_id).await,
            _ if turbo => {
                self.notifier.info("Click on a coverage point to open imagery");
                ClickOutcome::Rejected
            }
            Hit::CoveragePoint { .. } | Hit::Background => self.search_nearby(point).await,
        }
    }

    fn is_reselection(&self, point: Point<f64>) -> bool {
        let tolerance = self.engine.config.reselect_tolerance_m;
        self.active().is_some_and(|active| distance(point.y(), point.x(), active.lat, active.lon) < tolerance)
    }

    async fn open_nearest_in(&self, point: Point<f64>, sequence_id: &str) -> ClickOutcome {
        let images = self.session.cache().resolve(&self.engine.api, sequence_id).await;
        let Some(nearest) = nearest_in_sequence(point, &images) else {
            return self.no_imagery();
        };
        let opened = OpenedImage {
            sequence_id: sequence_id.to_string(),
            image_id: nearest.image.id.clone(),
            lon: nearest.image.lon,
            lat: nearest.image.lat,
            distance: nearest.distance,
        };
        self.open(opened, Some(&images))
    }

    async fn open_coverage_point(&self, point: Point<f64>, feature_id: &str) -> ClickOutcome {
        let known = self.session.with_turbo_layer(|layer| {
            layer.get(feature_id).map(|feature| (feature.sequence_id.clone(), feature.lon, feature.lat))
        });
        let Some((sequence_id, lon, lat)) = known else {
            self.notifier.info("Click on a coverage point to open imagery");
            return ClickOutcome::Rejected;
        };

        let sequence_id = match sequence_id {
            Some(sequence_id) => sequence_id,
            None => match self.engine.api.image_sequence(feature_id).await {
                Ok(Some(sequence_id)) => {
                    self.session.with_turbo_layer(|layer| layer.set_sequence(feature_id, &sequence_id));
                    sequence_id
                }
                Ok(None) => return self.no_imagery(),
                Err(err) => {
                    warn!(feature_id, error = %err, "sequence lookup failed");
                    return self.no_imagery();
                }
            },
        };

        let images = self.session.cache().resolve(&self.engine.api, &sequence_id).await;
        if images.is_empty() {
            return self.no_imagery();
        }
        let (lon, lat) = images.iter()
            .find(|image| image.id == feature_id)
            .map_or((lon, lat), |image| (image.lon, image.lat));
        let opened = OpenedImage {
            sequence_id,
            image_id: feature_id.to_string(),
            lon,
            lat,
            distance: distance(point.y(), point.x(), lat, lon),
        };
        self.open(opened, Some(&images))
    }

    async fn search_nearby(&self, point: Point<f64>) -> ClickOutcome {
        let config = &self.engine.config;
        let bbox = BBox::around(point.x(), point.y(), config.search_radius_m);
        let hits = match self.engine.api.images_in_bbox(&bbox, config.search_limit).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(error = %err, "proximity search failed");
                Vec::new()
            }
        };

        let ranked = rank_sequences_by_proximity(point, summarize_hits(point, &hits));
        if ranked.is_empty() {
            return self.no_imagery();
        }

        let candidates: Vec<_> = ranked.into_iter().take(config.max_candidate_sequences).collect();
        let loaded = join_all(candidates.iter().map(|c| self.session.cache().try_resolve(&self.engine.api, &c.sequence_id))).await;
        let mut resolved = Vec::with_capacity(candidates.len());
        let candidates: Vec<_> = candidates.into_iter()
            .zip(loaded)
            .map(|(candidate, images)| match images {
                Ok(images) if !images.is_empty() => {
                    resolved.push(candidate.sequence_id.clone());
                    candidate.with_images(point, images.to_vec())
                }
                Ok(_) => candidate,
                Err(err) => {
                    warn!(sequence_id = %candidate.sequence_id, error = %format!("{err:#}"), "keeping search hits for unresolved sequence");
                    candidate
                }
            })
            .collect();
        debug!(hits = hits.len(), candidates = candidates.len(), resolved = resolved.len(), "proximity search");
        self.viewer.show_candidates(&candidates);

        let Some(nearest) = nearest_global_image(point, &candidates) else {
            return self.no_imagery();
        };
        let Some(sequence) = candidates.iter().find(|c| c.sequence_id == nearest.sequence_id) else {
            return self.no_imagery();
        };
        let Some(image) = sequence.images.iter().find(|image| image.id == nearest.image_id) else {
            return self.no_imagery();
        };
        let opened = OpenedImage {
            sequence_id: nearest.sequence_id.clone(),
            image_id: nearest.image_id.clone(),
            lon: image.lon,
            lat: image.lat,
            distance: nearest.distance,
        };
        // Search hits are a partial route; only a resolved sequence is drawn or saved.
        let route = resolved.contains(&sequence.sequence_id).then_some(sequence.images.as_slice());
        self.open(opened, route)
    }

    fn open(&self, opened: OpenedImage, route: Option<&[SequenceImage]>) -> ClickOutcome {
        self.viewer.open(&opened.sequence_id, &opened.image_id);
        if let Some(images) = route {
            self.viewer.draw_route(&opened.sequence_id, images);
            let saved = ActiveSequence {
                sequence_id: opened.sequence_id.clone(),
                image_id: Some(opened.image_id.clone()),
                images: images.to_vec(),
            };
            if let Err(err) = self.store.save(&saved) {
                warn!(error = %err, "failed to persist active sequence");
            }
        }
        info!(sequence_id = %opened.sequence_id, image_id = %opened.image_id, distance = opened.distance, "opened image");
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(opened.clone());
        ClickOutcome::Opened(opened)
    }

    fn no_imagery(&self) -> ClickOutcome {
        self.notifier.info("No imagery found here");
        ClickOutcome::NoImagery
    }
}
