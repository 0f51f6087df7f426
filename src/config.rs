use std::{path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageKind;
use crate::geom::SpatialReference;
use crate::tile::MAX_ZOOM;

/// Environment variable that overrides [`Config::access_token`].
pub const ACCESS_TOKEN_ENV: &str = "IMAGERY_ACCESS_TOKEN";

/// Where one coverage kind's vector tiles come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSource {
    /// URL template with `{z}`, `{x}`, `{y}` and optionally `{access_token}`.
    pub template: String,
    /// Sub-layer holding the point features.
    pub layer: String,
}

impl LayerSource {
    fn new(template: &str, layer: &str) -> Self {
        Self { template: template.to_string(), layer: layer.to_string() }
    }
}

/// Tile sources per coverage kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSources {
    pub signs: LayerSource,
    pub objects: LayerSource,
    pub turbo: LayerSource,
}

impl Default for LayerSources {
    fn default() -> Self {
        Self {
            signs: LayerSource::new(
                "https://tiles.mapillary.com/maps/vtp/mly_map_feature_traffic_sign/2/{z}/{x}/{y}?access_token={access_token}",
                "traffic_sign",
            ),
            objects: LayerSource::new(
                "https://tiles.mapillary.com/maps/vtp/mly_map_feature_point/2/{z}/{x}/{y}?access_token={access_token}",
                "point",
            ),
            turbo: LayerSource::new(
                "https://tiles.mapillary.com/maps/vtp/mly1_public/2/{z}/{x}/{y}?access_token={access_token}",
                "image",
            ),
        }
    }
}

/// Engine configuration. Every field has a default, so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base url of the imagery graph API.
    pub api_url: String,
    /// Bearer credential for tiles and API calls.
    pub access_token: String,
    pub layers: LayerSources,
    /// Zoom level tiles are requested at, independent of the map zoom.
    pub tile_zoom: u8,
    /// Map zoom below which coverage layers are not queried.
    pub min_zoom: f64,
    /// Quiet period after the viewport stops moving before a refresh starts.
    pub debounce_ms: u64,
    /// Image ids per detail request.
    pub detail_batch_size: usize,
    /// Half-width of the proximity search box around a click, in meters.
    pub search_radius_m: f64,
    /// Maximum images requested by one proximity search.
    pub search_limit: usize,
    /// Candidate sequences fully loaded after ranking.
    pub max_candidate_sequences: usize,
    /// Clicks this close to the active image re-select it instead of searching.
    /// Tunable; 0.5 m is close to an exact-match guard.
    pub reselect_tolerance_m: f64,
    /// Radius for resolving a click to a shown coverage point, in meters.
    pub click_tolerance_m: f64,
    /// Reference decoded features are projected into.
    pub spatial_reference: SpatialReference,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://graph.mapillary.com".to_string(),
            access_token: String::new(),
            layers: LayerSources::default(),
            tile_zoom: 14,
            min_zoom: 16.0,
            debounce_ms: 600,
            detail_batch_size: 50,
            search_radius_m: 30.0,
            search_limit: 500,
            max_candidate_sequences: 5,
            reselect_tolerance_m: 0.5,
            click_tolerance_m: 3.0,
            spatial_reference: SpatialReference::WebMercator,
            request_timeout_secs: 20,
        }
    }
}

impl Config {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("parse config JSON")?;
        ensure!(config.tile_zoom <= MAX_ZOOM, "tile_zoom {} above {MAX_ZOOM}", config.tile_zoom);
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Take the access token from [`ACCESS_TOKEN_ENV`] when it is set and non-empty.
    pub fn with_env(mut self) -> Self {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.access_token = token.trim().to_string();
            }
        }
        self
    }

    pub fn layer(&self, kind: CoverageKind) -> &LayerSource {
        match kind {
            CoverageKind::Signs => &self.layers.signs,
            CoverageKind::Objects => &self.layers.objects,
            CoverageKind::Turbo => &self.layers.turbo,
        }
    }

    #[inline] pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    /// HTTP client shared by the tile source and the API client.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(concat!("imagery-coverage/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::limited(10))
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .build()
            .context("build HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"min_zoom": 15, "layers": {"turbo": {"template": "mem://{z}/{x}/{y}", "layer": "image"}}}"#).unwrap();
        assert_eq!(config.min_zoom, 15.0);
        assert_eq!(config.tile_zoom, 14);
        assert_eq!(config.layer(CoverageKind::Turbo).template, "mem://{z}/{x}/{y}");
        assert_eq!(config.layer(CoverageKind::Signs).layer, "traffic_sign");
        assert_eq!(config.reselect_tolerance_m, 0.5);
    }

    #[test]
    fn spatial_reference_is_snake_case() {
        let config = Config::from_json(r#"{"spatial_reference": "wgs84"}"#).unwrap();
        assert_eq!(config.spatial_reference, SpatialReference::Wgs84);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(Config::from_json("{min_zoom: }").is_err());
    }

    #[test]
    fn tile_zoom_beyond_the_grid_is_rejected() {
        let err = Config::from_json(r#"{"tile_zoom": 30}"#).unwrap_err();
        assert!(err.to_string().contains("tile_zoom 30"));
    }
}
