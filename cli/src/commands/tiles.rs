use anyhow::{bail, Result};
use imagery_coverage::{
    tile::{tile_count, tiles_covering_bbox, MAX_ZOOM},
    Config,
};
use tracing::warn;

use crate::cli::TilesArgs;
use crate::commands::parse_bbox;

/// Largest cover the command will list.
const MAX_LISTED_TILES: u64 = 10_000;

pub fn run(config: &Config, args: &TilesArgs) -> Result<()> {
    let bbox = parse_bbox(&args.bbox)?;
    let zoom = checked_zoom(args.zoom.unwrap_or(config.tile_zoom));
    let count = tile_count(&bbox, zoom);
    if count > MAX_LISTED_TILES {
        bail!("{count} tiles cover this box at zoom {zoom}, more than {MAX_LISTED_TILES}; use a smaller box or zoom");
    }
    for tile in tiles_covering_bbox(&bbox, zoom) {
        let [min_lon, min_lat, max_lon, max_lat] = tile.bounds().to_array();
        println!("{tile}\t{min_lon:.6},{min_lat:.6},{max_lon:.6},{max_lat:.6}");
    }
    Ok(())
}

fn checked_zoom(zoom: u8) -> u8 {
    if zoom > MAX_ZOOM {
        warn!(zoom, max = MAX_ZOOM, "clamping tile zoom");
    }
    zoom.min(MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(bbox: [f64; 4], zoom: Option<u8>) -> TilesArgs {
        TilesArgs { bbox: bbox.to_vec(), zoom }
    }

    #[test]
    fn zoom_is_clamped() {
        assert_eq!(checked_zoom(255), MAX_ZOOM);
        assert_eq!(checked_zoom(14), 14);
    }

    #[test]
    fn huge_covers_are_rejected() {
        let config = Config::default();
        let err = run(&config, &args([-180.0, -85.0, 180.0, 85.0], Some(255))).unwrap_err();
        assert!(err.to_string().contains("tiles cover this box"));
        assert!(run(&config, &args([13.30, 52.48, 13.31, 52.49], Some(14))).is_ok());
    }
}
