// src/detection/mod.rs

mod circle_fit;
mod hierarchy_ring;
mod types;

pub use circle_fit::CircleFitStrategy;
pub use hierarchy_ring::HierarchyRingStrategy;
pub use types::*;

use crate::contours::ContourSet;
use anyhow::Result;
use opencv::core::Mat;

/// A ring-candidate producer. The pipeline holds an ordered list of these
/// and stops at the first strategy that returns a non-empty result, so the
/// fallback order lives in the list, not in a hardcoded branch.
pub trait RingStrategy {
    fn name(&self) -> &'static str;

    fn detect(
        &self,
        mask: &Mat,
        contours: &ContourSet,
        params: &DetectorParams,
    ) -> Result<Vec<RingCandidate>>;
}

/// Strategies in priority order: the hierarchy ring test first, the
/// circle-fit annulus sampler as fallback.
pub fn default_strategies() -> Vec<Box<dyn RingStrategy>> {
    vec![
        Box::new(HierarchyRingStrategy) as Box<dyn RingStrategy>,
        Box::new(CircleFitStrategy),
    ]
}
