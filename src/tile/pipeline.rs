use ahash::AHashSet;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::geom::{BBox, SpatialReference};
use crate::tile::{decode_layer, tiles_covering_bbox, RawFeature, TileIndex, TileSource};

/// One vector-tile layer query: which tiles, from where, which sub-layer, and
/// the true query box used to drop features that only overlap via tile edges.
#[derive(Debug, Clone)]
pub struct LayerQuery<'a> {
    pub template: &'a str,
    pub layer: &'a str,
    pub bbox: BBox,
    pub zoom: u8,
}

impl LayerQuery<'_> {
    /// Tiles covering the query box at the query zoom.
    pub fn tiles(&self) -> Vec<TileIndex> { tiles_covering_bbox(&self.bbox, self.zoom) }
}

/// Fetch and decode every tile of `query`, returning deduplicated point features.
///
/// Tiles are fetched concurrently, then decoded in enumeration order, so the output
/// is in tile order and the first emission of an id wins. Failed tiles are logged
/// and skipped; when every tile fails the result is empty.
pub async fn fetch_layer<S: TileSource>(source: &S, query: &LayerQuery<'_>, sr: SpatialReference) -> Vec<RawFeature> {
    let tiles = query.tiles();
    let payloads = join_all(tiles.iter().map(|&tile| source.fetch(query.template, tile))).await;

    let mut seen: AHashSet<String> = AHashSet::new();
    let mut features = Vec::new();
    let mut skipped = 0usize;

    for (tile, payload) in tiles.iter().zip(payloads) {
        let decoded = payload.and_then(|bytes| decode_layer(&bytes, *tile, query.layer, sr));
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(%tile, error = %err, "skipping tile");
                skipped += 1;
                continue;
            }
        };

        for feature in decoded {
            if !query.bbox.contains(feature.lon, feature.lat) { continue }
            if seen.insert(feature.id.clone()) {
                features.push(feature);
            }
        }
    }

    if skipped > 0 && skipped == tiles.len() {
        warn!(layer = query.layer, tiles = tiles.len(), "no tile could be loaded");
    }
    debug!(layer = query.layer, tiles = tiles.len(), skipped, features = features.len(), "layer fetched");

    features
}
