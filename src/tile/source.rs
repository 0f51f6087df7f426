use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use reqwest::Client;

use crate::tile::TileIndex;

/// Byte-level access to vector tiles addressed by a `{z}/{x}/{y}` URL template.
pub trait TileSource: Send + Sync {
    /// Fetch the raw payload of one tile. Any error means "skip this tile".
    fn fetch(&self, template: &str, tile: TileIndex) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Tile source backed by HTTP.
///
/// The template may carry an `{access_token}` placeholder, which is filled
/// from the configured credential.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: Client,
    access_token: String,
}

impl HttpTileSource {
    pub fn new(client: Client, access_token: impl Into<String>) -> Self {
        Self { client, access_token: access_token.into() }
    }

    fn url(&self, template: &str, tile: TileIndex) -> String {
        tile.fill_template(template).replace("{access_token}", &self.access_token)
    }
}

impl TileSource for HttpTileSource {
    async fn fetch(&self, template: &str, tile: TileIndex) -> Result<Bytes> {
        let url = self.url(template, tile);
        let resp = self.client.get(&url).send().await
            .with_context(|| format!("GET tile {tile}"))?
            .error_for_status()
            .with_context(|| format!("GET tile {tile} returned error status"))?;
        resp.bytes().await.with_context(|| format!("read tile {tile}"))
    }
}

/// Simple in-memory tile source.
/// Keys are expanded tile URLs, e.g. "mem://image/14/8800/5373".
#[derive(Default)]
pub struct MemTiles {
    tiles: HashMap<String, Bytes>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl MemTiles {
    pub fn new() -> Self { Self::default() }

    /// Store the payload served for `tile` under `template`.
    pub fn insert(&mut self, template: &str, tile: TileIndex, bytes: impl Into<Bytes>) {
        self.tiles.insert(tile.fill_template(template), bytes.into());
    }

    /// Delay every fetch, to simulate a slow network.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches served so far, including misses.
    pub fn fetch_count(&self) -> usize { self.fetches.load(Ordering::SeqCst) }
}

impl TileSource for MemTiles {
    async fn fetch(&self, template: &str, tile: TileIndex) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let key = tile.fill_template(template);
        self.tiles.get(&key).cloned()
            .ok_or_else(|| anyhow!("missing tile: {key}"))
    }
}
