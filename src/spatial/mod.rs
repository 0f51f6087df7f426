//! Nearest-image and nearest-sequence resolution by great-circle distance.

mod index;
mod resolver;

pub use index::PointIndex;
pub use resolver::{
    nearest_global_image, nearest_in_sequence, rank_sequences_by_proximity, summarize_hits,
    GlobalNearest, NearestImage, SequenceSummary,
};
