use anyhow::Result;

use crate::api::GraphApi;
use crate::config::Config;
use crate::tile::HttpTileSource;

/// Configuration plus the two remote seams, shared by the refresh scheduler and
/// the click dispatcher.
#[derive(Debug)]
pub struct Engine<T, A> {
    pub config: Config,
    pub tiles: T,
    pub api: A,
}

impl<T, A> Engine<T, A> {
    pub fn new(config: Config, tiles: T, api: A) -> Self {
        Self { config, tiles, api }
    }
}

impl Engine<HttpTileSource, GraphApi> {
    /// Engine backed by the HTTP tile server and graph API named in `config`.
    pub fn connect(config: Config) -> Result<Self> {
        let client = config.http_client()?;
        let tiles = HttpTileSource::new(client.clone(), config.access_token.clone());
        let api = GraphApi::new(client, config.api_url.clone(), config.access_token.clone());
        Ok(Self::new(config, tiles, api))
    }
}
