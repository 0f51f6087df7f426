//! Collaborators provided by the hosting map application.

use serde::Serialize;

use crate::api::SequenceImage;
use crate::coverage::{CoverageKind, CoverageResult, SignFeature};
use crate::spatial::SequenceSummary;

/// Data handed to the renderer for one coverage kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerData {
    Coverage(CoverageResult),
    Signs { features: Vec<SignFeature> },
}

impl LayerData {
    pub fn len(&self) -> usize {
        match self {
            Self::Coverage(result) => result.features.len(),
            Self::Signs { features } => features.len(),
        }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// The rendering host. Showing a layer replaces whatever that kind showed before,
/// including its legend.
pub trait LayerSink: Send + Sync {
    fn show(&self, kind: CoverageKind, data: &LayerData);
    fn clear(&self, kind: CoverageKind);
}

/// User-facing messages.
pub trait Notifier: Send + Sync {
    /// Persistent warning for a kind, shown until dismissed.
    fn warn(&self, kind: CoverageKind, message: &str);
    fn dismiss(&self, kind: CoverageKind);
    /// Transient, auto-dismissing message.
    fn info(&self, message: &str);
}

/// The imagery viewer.
pub trait Viewer: Send + Sync {
    fn open(&self, sequence_id: &str, image_id: &str);
    /// Ordered coordinates of the opened sequence, for route drawing.
    fn draw_route(&self, sequence_id: &str, images: &[SequenceImage]);
    /// Candidate sequences found near a click, with their colors.
    fn show_candidates(&self, _candidates: &[SequenceSummary]) {}
}
