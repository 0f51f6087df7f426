//! Vector tile addressing, fetching and decoding.

mod decode;
mod index;
mod pipeline;
mod source;

pub use decode::{decode_layer, tile_point_to_lonlat, Properties, PropertyValue, RawFeature, TILE_EXTENT};
pub use index::{tile_count, to_tile_index, tiles_covering_bbox, TileIndex, MAX_ZOOM};
pub use pipeline::{fetch_layer, LayerQuery};
pub use source::{HttpTileSource, MemTiles, TileSource};
