use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashMap;
use anyhow::{Context, Result};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::api::{ImageryApi, SequenceImage};

type Slot = Arc<OnceCell<Arc<[SequenceImage]>>>;

/// Session cache of ordered image coordinates, keyed by sequence id.
///
/// Entries are filled once per sequence and only dropped by [`SequenceCache::clear`].
/// Concurrent resolves of one sequence share a single remote resolution.
#[derive(Debug, Default)]
pub struct SequenceCache {
    entries: Mutex<AHashMap<String, Slot>>,
}

impl SequenceCache {
    pub fn new() -> Self { Self::default() }

    fn slot(&self, sequence_id: &str) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(sequence_id.to_string()).or_default())
    }

    pub fn get(&self, sequence_id: &str) -> Option<Arc<[SequenceImage]>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(sequence_id).and_then(|slot| slot.get().cloned())
    }

    pub fn insert(&self, sequence_id: &str, images: impl Into<Arc<[SequenceImage]>>) -> Arc<[SequenceImage]> {
        let images = images.into();
        let slot = Arc::new(OnceCell::new_with(Some(Arc::clone(&images))));
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
            .insert(sequence_id.to_string(), slot);
        images
    }

    #[inline] pub fn contains(&self, sequence_id: &str) -> bool { self.get(sequence_id).is_some() }

    /// Number of resolved sequences.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|slot| slot.initialized()).count()
    }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Drop every cached sequence.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Ordered images of a sequence, from the cache or from two remote calls:
    /// the ordered id list, then one batched geometry lookup re-assembled in id order.
    ///
    /// Images without geometry are dropped. A failure is returned and caches nothing.
    pub async fn try_resolve<A: ImageryApi>(&self, api: &A, sequence_id: &str) -> Result<Arc<[SequenceImage]>> {
        let slot = self.slot(sequence_id);
        if let Some(images) = slot.get() {
            debug!(sequence_id, "sequence cache hit");
            return Ok(Arc::clone(images));
        }
        let images = slot.get_or_try_init(|| fetch_sequence(api, sequence_id)).await?;
        Ok(Arc::clone(images))
    }

    /// [`SequenceCache::try_resolve`], degrading a failure to an empty list.
    pub async fn resolve<A: ImageryApi>(&self, api: &A, sequence_id: &str) -> Arc<[SequenceImage]> {
        match self.try_resolve(api, sequence_id).await {
            Ok(images) => images,
            Err(err) => {
                warn!(sequence_id, error = %format!("{err:#}"), "failed to resolve sequence");
                Arc::from(Vec::<SequenceImage>::new())
            }
        }
    }
}

async fn fetch_sequence<A: ImageryApi>(api: &A, sequence_id: &str) -> Result<Arc<[SequenceImage]>> {
    let ids = api.sequence_image_ids(sequence_id).await
        .with_context(|| format!("list images of sequence {sequence_id}"))?;
    let geometries = api.image_geometries(&ids).await
        .with_context(|| format!("fetch geometry of sequence {sequence_id}"))?;

    let ordered: Vec<SequenceImage> = ids.iter()
        .filter_map(|id| geometries.get(id))
        .filter(|image| image.has_geometry())
        .cloned()
        .collect();

    debug!(sequence_id, ids = ids.len(), images = ordered.len(), "sequence resolved");
    Ok(ordered.into())
}
