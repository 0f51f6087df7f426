//! Remote imagery metadata: sequences, image geometry and per-image details.

mod http;
mod mem;
mod types;

use std::{collections::HashMap, future::Future};

use anyhow::Result;

use crate::geom::BBox;

pub use http::GraphApi;
pub use mem::{ApiCalls, MemApi, MemImage};
pub use types::{ImageDetail, ImageHit, RawTimestamp, SequenceImage};

/// Read-only access to imagery metadata.
///
/// Every method is a single remote round trip; callers decide how to batch.
pub trait ImageryApi: Send + Sync {
    /// Ids of the images of a sequence, in capture order.
    fn sequence_image_ids(&self, sequence_id: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Geometry for a batch of images, keyed by id. Ids without geometry are absent.
    fn image_geometries(&self, ids: &[String]) -> impl Future<Output = Result<HashMap<String, SequenceImage>>> + Send;

    /// Creator, sequence, capture time and panorama flag for a batch of images.
    fn image_details(&self, ids: &[String]) -> impl Future<Output = Result<Vec<ImageDetail>>> + Send;

    /// The sequence an image belongs to.
    fn image_sequence(&self, image_id: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Images inside `bbox`, at most `limit` of them.
    fn images_in_bbox(&self, bbox: &BBox, limit: usize) -> impl Future<Output = Result<Vec<ImageHit>>> + Send;
}
