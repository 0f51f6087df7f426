use chrono::{DateTime, Utc};
use geo::Point;
use serde::Serialize;

use crate::api::{ImageHit, SequenceImage};
use crate::color::{sequence_color, Rgb};
use crate::geom::distance;

/// Distance in meters from `point` (x = lon, y = lat) to an image.
#[inline]
fn image_distance(point: Point<f64>, image: &SequenceImage) -> f64 {
    distance(point.y(), point.x(), image.lat, image.lon)
}

/// The closest image of one sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestImage<'a> {
    pub image: &'a SequenceImage,
    pub distance: f64,
}

/// Linear scan for the image closest to `point`; ties keep the first occurrence.
pub fn nearest_in_sequence(point: Point<f64>, images: &[SequenceImage]) -> Option<NearestImage<'_>> {
    images.iter().fold(None, |best: Option<NearestImage<'_>>, image| {
        let d = image_distance(point, image);
        match best {
            Some(b) if b.distance <= d => Some(b),
            _ => Some(NearestImage { image, distance: d }),
        }
    })
}

/// One candidate route near a click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSummary {
    pub sequence_id: String,
    /// Images in capture order.
    pub images: Vec<SequenceImage>,
    pub captured_at: Option<DateTime<Utc>>,
    /// Distance from the click to the closest image, in meters.
    pub min_distance: f64,
    pub color_index: usize,
}

impl SequenceSummary {
    pub fn color(&self) -> Rgb { sequence_color(self.color_index) }

    /// Replace the image list (e.g. once fully loaded) and refresh `min_distance`.
    pub fn with_images(mut self, point: Point<f64>, images: Vec<SequenceImage>) -> Self {
        self.min_distance = nearest_in_sequence(point, &images).map_or(f64::INFINITY, |n| n.distance);
        self.images = images;
        self
    }
}

/// Group bounding-box hits by sequence, in first-seen order.
///
/// Hits without a sequence id are dropped. Color indices follow the grouping
/// order, so a sequence keeps its color whatever its later rank.
pub fn summarize_hits(point: Point<f64>, hits: &[ImageHit]) -> Vec<SequenceSummary> {
    let mut summaries: Vec<SequenceSummary> = Vec::new();

    for hit in hits {
        let Some(seq) = hit.sequence_id.as_deref() else { continue };
        let image = SequenceImage::new(hit.id.clone(), hit.lon, hit.lat);
        let d = image_distance(point, &image);

        match summaries.iter_mut().find(|s| s.sequence_id == seq) {
            Some(summary) => {
                summary.min_distance = summary.min_distance.min(d);
                summary.captured_at = summary.captured_at.or(hit.captured_at);
                summary.images.push(image);
            }
            None => {
                let color_index = summaries.len();
                summaries.push(SequenceSummary {
                    sequence_id: seq.to_string(),
                    images: vec![image],
                    captured_at: hit.captured_at,
                    min_distance: d,
                    color_index,
                });
            }
        }
    }

    summaries
}

/// Sort candidates by their closest image to `point`, ascending. The sort is stable.
pub fn rank_sequences_by_proximity(point: Point<f64>, mut candidates: Vec<SequenceSummary>) -> Vec<SequenceSummary> {
    for candidate in candidates.iter_mut() {
        candidate.min_distance = nearest_in_sequence(point, &candidate.images).map_or(f64::INFINITY, |n| n.distance);
    }
    candidates.sort_by(|a, b| a.min_distance.total_cmp(&b.min_distance));
    candidates
}

/// The single closest image over all candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalNearest {
    pub sequence_id: String,
    pub image_id: String,
    pub distance: f64,
}

/// Scan every image of every candidate; a sequence's summary distance is not trusted,
/// since it may predate loading the full image list.
pub fn nearest_global_image(point: Point<f64>, sequences: &[SequenceSummary]) -> Option<GlobalNearest> {
    sequences.iter()
        .filter_map(|seq| nearest_in_sequence(point, &seq.images).map(|n| (seq, n)))
        .fold(None, |best: Option<GlobalNearest>, (seq, n)| match best {
            Some(b) if b.distance <= n.distance => Some(b),
            _ => Some(GlobalNearest {
                sequence_id: seq.sequence_id.clone(),
                image_id: n.image.id.clone(),
                distance: n.distance,
            }),
        })
}
