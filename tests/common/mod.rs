#![allow(dead_code)]

use std::sync::{Mutex, PoisonError};

use imagery_coverage::{
    api::SequenceImage,
    coverage::CoverageKind,
    geom::BBox,
    tile::{tile_point_to_lonlat, TileIndex, TILE_EXTENT},
    Config, LayerData, LayerSink, LayerSource, Notifier, Viewer,
};
use mvt::{GeomEncoder, GeomType, Tile};

pub const TURBO_TEMPLATE: &str = "mem://image/{z}/{x}/{y}";
pub const SIGNS_TEMPLATE: &str = "mem://signs/{z}/{x}/{y}";

/// Default config with in-memory tile templates.
pub fn config() -> Config {
    let mut config = Config::default();
    config.layers.turbo = LayerSource { template: TURBO_TEMPLATE.into(), layer: "image".into() };
    config.layers.signs = LayerSource { template: SIGNS_TEMPLATE.into(), layer: "traffic_sign".into() };
    config.layers.objects = LayerSource { template: "mem://points/{z}/{x}/{y}".into(), layer: "point".into() };
    config
}

/// Encode one vector tile with a point layer; each point is `(id, px, py)` in tile pixels.
pub fn point_tile(layer: &str, points: &[(&str, f64, f64)]) -> Vec<u8> {
    let mut tile = Tile::new(4096);
    let mut mvt_layer = tile.create_layer(layer);
    for (fid, &(id, x, y)) in points.iter().enumerate() {
        let geom = GeomEncoder::new(GeomType::Point).point(x, y).unwrap().encode().unwrap();
        let mut feature = mvt_layer.into_feature(geom);
        feature.set_id(fid as u64 + 1);
        feature.add_tag_string("id", id);
        feature.add_tag_string("value", "regulatory--stop--g1");
        mvt_layer = feature.into_layer();
    }
    tile.add_layer(mvt_layer).unwrap();
    tile.to_bytes().unwrap()
}

/// Where a tile pixel lands on the map.
pub fn lonlat(tile: TileIndex, px: f64, py: f64) -> (f64, f64) {
    tile_point_to_lonlat(tile, TILE_EXTENT, px, py)
}

/// The middle 80% of a tile, so a query touches no neighbor.
pub fn inner_bbox(tile: TileIndex) -> BBox {
    let b = tile.bounds();
    let (dx, dy) = ((b.max_lon - b.min_lon) * 0.1, (b.max_lat - b.min_lat) * 0.1);
    BBox::new(b.min_lon + dx, b.min_lat + dy, b.max_lon - dx, b.max_lat - dy)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Show { kind: CoverageKind, ids: Vec<String>, legend: Option<Vec<String>>, popups: bool },
    Clear(CoverageKind),
    Warn(CoverageKind),
    Dismiss(CoverageKind),
    Info(String),
    Open { sequence_id: String, image_id: String },
    Route { sequence_id: String, images: usize },
    Candidates(Vec<String>),
}

/// Host that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn shown(&self) -> Vec<Event> {
        self.events().into_iter().filter(|e| matches!(e, Event::Show { .. })).collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events().into_iter().filter_map(|e| match e { Event::Info(m) => Some(m), _ => None }).collect()
    }

    pub fn opened(&self) -> Vec<(String, String)> {
        self.events().into_iter()
            .filter_map(|e| match e { Event::Open { sequence_id, image_id } => Some((sequence_id, image_id)), _ => None })
            .collect()
    }
}

impl LayerSink for Recorder {
    fn show(&self, kind: CoverageKind, data: &LayerData) {
        let event = match data {
            LayerData::Coverage(result) => Event::Show {
                kind,
                ids: result.features.iter().map(|f| f.id.clone()).collect(),
                legend: result.legend.as_ref().map(|l| l.entries.iter().map(|e| e.year.clone()).collect()),
                popups: result.popups_enabled,
            },
            LayerData::Signs { features } => Event::Show {
                kind,
                ids: features.iter().map(|f| f.id.clone()).collect(),
                legend: None,
                popups: true,
            },
        };
        self.push(event);
    }

    fn clear(&self, kind: CoverageKind) { self.push(Event::Clear(kind)) }
}

impl Notifier for Recorder {
    fn warn(&self, kind: CoverageKind, _message: &str) { self.push(Event::Warn(kind)) }

    fn dismiss(&self, kind: CoverageKind) { self.push(Event::Dismiss(kind)) }

    fn info(&self, message: &str) { self.push(Event::Info(message.to_string())) }
}

impl Viewer for Recorder {
    fn open(&self, sequence_id: &str, image_id: &str) {
        self.push(Event::Open { sequence_id: sequence_id.into(), image_id: image_id.into() });
    }

    fn draw_route(&self, sequence_id: &str, images: &[SequenceImage]) {
        self.push(Event::Route { sequence_id: sequence_id.into(), images: images.len() });
    }

    fn show_candidates(&self, candidates: &[imagery_coverage::spatial::SequenceSummary]) {
        self.push(Event::Candidates(candidates.iter().map(|c| c.sequence_id.clone()).collect()));
    }
}
