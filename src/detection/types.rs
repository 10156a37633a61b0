// src/detection/types.rs

use opencv::core::Rect;

/// Fixed label attached to every confirmed detection. Classification of the
/// sign's meaning is out of scope; the renderer shows this as-is.
pub const SIGN_LABEL: &str = "TRAFFIC SIGN";

/// One ring hypothesis for the current frame. The score is strategy-specific
/// and only meaningful for ranking within a frame.
#[derive(Debug, Clone, Copy)]
pub struct RingCandidate {
    pub rect: Rect,
    pub center_x: f32,
    pub center_y: f32,
    pub score: f32,
}

/// A candidate that survived temporal confirmation, ready for the renderer.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmedSign {
    pub rect: Rect,
    pub label: &'static str,
}

/// All detector tunables. Immutable after construction; `Default` matches
/// the documented reference values, overrides exist for tests and tuning.
#[derive(Debug, Clone)]
pub struct DetectorParams {
    /// Minimum contour area considered by either strategy (px^2).
    pub min_contour_area: f64,
    /// Accepted outer-boundary circularity range (loose: the outer edge may
    /// be distorted by attachment to poles or other red objects).
    pub outer_circularity: [f64; 2],
    /// Accepted bounding-rect width/height range.
    pub aspect_ratio: [f64; 2],
    /// Minimum hole circularity (strict: the inner hole is typically clean).
    pub min_hole_circularity: f64,
    /// Accepted holeArea/outerArea range; rejects near-solid blobs and
    /// near-empty slivers.
    pub ringness: [f64; 2],
    /// Minimum enclosing-circle radius for the fallback strategy (px).
    pub min_circle_radius: f32,
    /// Annulus half-thickness as a fraction of the fitted radius.
    pub annulus_thickness_ratio: f32,
    /// Angular sample positions around the annulus.
    pub annulus_angles: u32,
    /// Minimum red fraction along the annulus.
    pub min_ring_fraction: f32,
    /// Center disk radius as a fraction of the fitted radius.
    pub center_disk_ratio: f32,
    /// Maximum red fraction inside the center disk (ring, not solid disk).
    pub max_center_fraction: f32,
    /// Per-frame cap on ranked candidates per strategy.
    pub max_candidates: usize,
    /// Persistence window length in frames.
    pub history_frames: usize,
    /// Occurrences within the window required to confirm.
    pub confirm_hits: usize,
    /// Euclidean center tolerance when matching across frames (px).
    pub match_radius: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_contour_area: 700.0,
            outer_circularity: [0.55, 1.30],
            aspect_ratio: [0.65, 1.35],
            min_hole_circularity: 0.70,
            ringness: [0.18, 0.85],
            min_circle_radius: 18.0,
            annulus_thickness_ratio: 0.14,
            annulus_angles: 48,
            min_ring_fraction: 0.58,
            center_disk_ratio: 0.45,
            max_center_fraction: 0.22,
            max_candidates: 6,
            history_frames: 6,
            confirm_hits: 3,
            match_radius: 40.0,
        }
    }
}

/// Rank candidates by descending score and cap the list.
pub fn rank_and_cap(mut candidates: Vec<RingCandidate>, cap: usize) -> Vec<RingCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(cap);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: f32) -> RingCandidate {
        RingCandidate {
            rect: Rect::new(0, 0, 10, 10),
            center_x: 5.0,
            center_y: 5.0,
            score,
        }
    }

    #[test]
    fn test_rank_and_cap_orders_descending() {
        let ranked = rank_and_cap(vec![candidate(0.2), candidate(0.9), candidate(0.5)], 6);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].score, 0.9);
        assert_eq!(ranked[2].score, 0.2);
    }

    #[test]
    fn test_rank_and_cap_truncates() {
        let many: Vec<_> = (0..10).map(|i| candidate(i as f32 / 10.0)).collect();
        let ranked = rank_and_cap(many, 6);
        assert_eq!(ranked.len(), 6);
        assert_eq!(ranked[0].score, 0.9);
    }
}
