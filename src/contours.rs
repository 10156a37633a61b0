// src/contours.rs
//
// Contour + hierarchy extraction over the binary mask. This is the external
// vision primitive the ring detectors consume: every contour, with enough of
// the two-level RETR_CCOMP hierarchy to answer "is this a top-level outer
// boundary" and "which contour is its representative hole".

use anyhow::Result;
use opencv::core::{Mat, Point, Vec4i, Vector};
use opencv::imgproc;
use opencv::prelude::VectorToVec;

// Vec4i hierarchy layout: [next, previous, first_child, parent]
const FIRST_CHILD: usize = 2;
const PARENT: usize = 3;

pub struct ContourSet {
    contours: Vector<Vector<Point>>,
    hierarchy: Vec<Vec4i>,
}

impl ContourSet {
    pub fn extract(mask: &Mat) -> Result<Self> {
        let mut contours: Vector<Vector<Point>> = Vector::new();
        let mut hierarchy: Vector<Vec4i> = Vector::new();
        imgproc::find_contours_with_hierarchy(
            mask,
            &mut contours,
            &mut hierarchy,
            imgproc::RETR_CCOMP,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;
        Ok(Self {
            contours,
            hierarchy: hierarchy.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// The contour polyline at `idx`. Vector elements are ref-counted, so
    /// this is a cheap handle, not a deep copy.
    pub fn contour(&self, idx: usize) -> Result<Vector<Point>> {
        Ok(self.contours.get(idx)?)
    }

    /// True if the contour has no parent (outer boundary).
    pub fn is_top_level(&self, idx: usize) -> bool {
        self.hierarchy
            .get(idx)
            .map(|h| h[PARENT] < 0)
            .unwrap_or(false)
    }

    /// Index of the representative child hole, if the contour owns one.
    pub fn child_hole(&self, idx: usize) -> Option<usize> {
        self.hierarchy.get(idx).and_then(|h| {
            let child = h[FIRST_CHILD];
            (child >= 0).then_some(child as usize)
        })
    }
}
