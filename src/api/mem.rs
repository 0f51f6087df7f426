use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};

use crate::api::{ImageDetail, ImageHit, ImageryApi, SequenceImage};
use crate::geom::BBox;

/// An image known to [`MemApi`].
#[derive(Debug, Clone, Default)]
pub struct MemImage {
    pub lon: f64,
    pub lat: f64,
    pub sequence_id: Option<String>,
    pub creator_username: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub is_pano: Option<bool>,
}

/// Round trips served by [`MemApi`], per endpoint.
#[derive(Debug, Default)]
pub struct ApiCalls {
    pub sequence_image_ids: AtomicUsize,
    pub image_geometries: AtomicUsize,
    pub image_details: AtomicUsize,
    pub image_sequence: AtomicUsize,
    pub images_in_bbox: AtomicUsize,
}

impl ApiCalls {
    fn bump(counter: &AtomicUsize) { counter.fetch_add(1, Ordering::SeqCst); }
}

/// Simple in-memory imagery API.
/// Sequences keep their images in insertion order.
#[derive(Debug, Default)]
pub struct MemApi {
    images: HashMap<String, MemImage>,
    sequences: HashMap<String, Vec<String>>,
    fail_details: AtomicBool,
    fail_sequences: AtomicBool,
    delay: Option<Duration>,
    pub calls: ApiCalls,
}

impl MemApi {
    pub fn new() -> Self { Self::default() }

    /// Add an image; it is appended to its sequence if it has one.
    pub fn insert(&mut self, id: &str, image: MemImage) {
        if let Some(seq) = &image.sequence_id {
            self.sequences.entry(seq.clone()).or_default().push(id.to_string());
        }
        self.images.insert(id.to_string(), image);
    }

    /// Register a sequence id with an explicit image order, including ids without images.
    pub fn set_sequence(&mut self, sequence_id: &str, ids: &[&str]) {
        self.sequences.insert(sequence_id.to_string(), ids.iter().map(|s| s.to_string()).collect());
    }

    /// Make every detail batch fail from now on.
    pub fn fail_details(&self, fail: bool) { self.fail_details.store(fail, Ordering::SeqCst); }

    /// Make every sequence listing fail from now on.
    pub fn fail_sequences(&self, fail: bool) { self.fail_sequences.store(fail, Ordering::SeqCst); }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl ImageryApi for MemApi {
    async fn sequence_image_ids(&self, sequence_id: &str) -> Result<Vec<String>> {
        ApiCalls::bump(&self.calls.sequence_image_ids);
        self.latency().await;
        if self.fail_sequences.load(Ordering::SeqCst) {
            bail!("sequence listing failed");
        }
        self.sequences.get(sequence_id).cloned()
            .ok_or_else(|| anyhow!("unknown sequence: {sequence_id}"))
    }

    async fn image_geometries(&self, ids: &[String]) -> Result<HashMap<String, SequenceImage>> {
        ApiCalls::bump(&self.calls.image_geometries);
        self.latency().await;
        Ok(ids.iter()
            .filter_map(|id| {
                let image = self.images.get(id)?;
                Some((id.clone(), SequenceImage::new(id.clone(), image.lon, image.lat)))
            })
            .collect())
    }

    async fn image_details(&self, ids: &[String]) -> Result<Vec<ImageDetail>> {
        ApiCalls::bump(&self.calls.image_details);
        self.latency().await;
        if self.fail_details.load(Ordering::SeqCst) {
            bail!("detail batch failed");
        }
        Ok(ids.iter()
            .filter_map(|id| {
                let image = self.images.get(id)?;
                Some(ImageDetail {
                    id: id.clone(),
                    creator_username: image.creator_username.clone(),
                    sequence_id: image.sequence_id.clone(),
                    captured_at: image.captured_at,
                    is_pano: image.is_pano,
                })
            })
            .collect())
    }

    async fn image_sequence(&self, image_id: &str) -> Result<Option<String>> {
        ApiCalls::bump(&self.calls.image_sequence);
        self.latency().await;
        Ok(self.images.get(image_id).and_then(|i| i.sequence_id.clone()))
    }

    async fn images_in_bbox(&self, bbox: &BBox, limit: usize) -> Result<Vec<ImageHit>> {
        ApiCalls::bump(&self.calls.images_in_bbox);
        self.latency().await;
        let mut hits: Vec<ImageHit> = self.images.iter()
            .filter(|(_, image)| bbox.contains(image.lon, image.lat))
            .map(|(id, image)| ImageHit {
                id: id.clone(),
                lon: image.lon,
                lat: image.lat,
                sequence_id: image.sequence_id.clone(),
                captured_at: image.captured_at,
            })
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits.truncate(limit);
        Ok(hits)
    }
}
