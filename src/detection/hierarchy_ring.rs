// src/detection/hierarchy_ring.rs
//
// Primary ring detector: nested contour topology.
//
// A red sign rim segments as an outer boundary with a clean inner hole.
// The outer shape test is loose because attachment to poles or adjacent
// red objects distorts it; the hole test is strict because the interior
// is usually unobstructed. The ringness ratio rejects near-solid blobs
// and near-empty slivers.

use super::types::{rank_and_cap, DetectorParams, RingCandidate};
use super::RingStrategy;
use crate::contours::ContourSet;
use anyhow::Result;
use opencv::core::Mat;
use opencv::imgproc;

pub struct HierarchyRingStrategy;

impl RingStrategy for HierarchyRingStrategy {
    fn name(&self) -> &'static str {
        "hierarchy-ring"
    }

    fn detect(
        &self,
        _mask: &Mat,
        contours: &ContourSet,
        params: &DetectorParams,
    ) -> Result<Vec<RingCandidate>> {
        let mut candidates = Vec::new();

        for idx in 0..contours.len() {
            if !contours.is_top_level(idx) {
                continue;
            }
            let Some(hole_idx) = contours.child_hole(idx) else {
                continue;
            };

            let outer = contours.contour(idx)?;
            let outer_area = imgproc::contour_area(&outer, false)?;
            if outer_area < params.min_contour_area {
                continue;
            }
            let outer_perimeter = imgproc::arc_length(&outer, true)?;
            if outer_perimeter <= 1.0 {
                continue;
            }
            let outer_circ = circularity(outer_area, outer_perimeter);

            let rect = imgproc::bounding_rect(&outer)?;
            if rect.height == 0 {
                continue;
            }
            let aspect = rect.width as f64 / rect.height as f64;

            let hole = contours.contour(hole_idx)?;
            let hole_area = imgproc::contour_area(&hole, false)?;
            let hole_perimeter = imgproc::arc_length(&hole, true)?;
            if hole_perimeter <= 1.0 {
                continue;
            }
            let hole_circ = circularity(hole_area, hole_perimeter);

            let ringness = hole_area / outer_area.max(1.0);

            let accepted = outer_circ >= params.outer_circularity[0]
                && outer_circ <= params.outer_circularity[1]
                && aspect >= params.aspect_ratio[0]
                && aspect <= params.aspect_ratio[1]
                && hole_circ >= params.min_hole_circularity
                && ringness >= params.ringness[0]
                && ringness <= params.ringness[1];
            if !accepted {
                continue;
            }

            let score = 0.6 * hole_circ + 0.4 * outer_circ;
            candidates.push(RingCandidate {
                rect,
                center_x: rect.x as f32 + rect.width as f32 / 2.0,
                center_y: rect.y as f32 + rect.height as f32 / 2.0,
                score: score as f32,
            });
        }

        Ok(rank_and_cap(candidates, params.max_candidates))
    }
}

/// `4 * pi * area / perimeter^2` — 1.0 for an ideal circle.
fn circularity(area: f64, perimeter: f64) -> f64 {
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{self, Mat, Point, Scalar};

    fn draw_ring(mask: &mut Mat, cx: i32, cy: i32, outer_r: i32, inner_r: i32) {
        imgproc::circle(
            mask,
            Point::new(cx, cy),
            outer_r,
            Scalar::all(255.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        imgproc::circle(
            mask,
            Point::new(cx, cy),
            inner_r,
            Scalar::all(0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
    }

    fn blank(rows: i32, cols: i32) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC1, Scalar::all(0.0)).unwrap()
    }

    fn detect(mask: &Mat) -> Vec<RingCandidate> {
        let contours = ContourSet::extract(mask).unwrap();
        HierarchyRingStrategy
            .detect(mask, &contours, &DetectorParams::default())
            .unwrap()
    }

    #[test]
    fn test_clean_ring_accepted_with_tight_rect() {
        let mut mask = blank(200, 200);
        draw_ring(&mut mask, 100, 100, 40, 26);
        let candidates = detect(&mask);
        assert_eq!(candidates.len(), 1);

        let rect = candidates[0].rect;
        assert!((rect.x - 60).abs() <= 2);
        assert!((rect.y - 60).abs() <= 2);
        assert!((rect.width - 80).abs() <= 3);
        assert!((rect.height - 80).abs() <= 3);
        assert!((candidates[0].center_x - 100.0).abs() <= 2.0);
        assert!((candidates[0].center_y - 100.0).abs() <= 2.0);
    }

    #[test]
    fn test_solid_disk_rejected() {
        let mut mask = blank(200, 200);
        imgproc::circle(
            &mut mask,
            Point::new(100, 100),
            40,
            Scalar::all(255.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        assert!(detect(&mask).is_empty());
    }

    #[test]
    fn test_small_ring_below_area_floor_rejected() {
        // Outer radius 14 -> area ~615 < 700
        let mut mask = blank(100, 100);
        draw_ring(&mut mask, 50, 50, 14, 8);
        assert!(detect(&mask).is_empty());
    }

    #[test]
    fn test_pinhole_ring_rejected_by_ringness() {
        // Hole radius 10 on outer 40: ratio ~0.06 < 0.18
        let mut mask = blank(200, 200);
        draw_ring(&mut mask, 100, 100, 40, 10);
        assert!(detect(&mask).is_empty());
    }

    #[test]
    fn test_elongated_blob_rejected_by_aspect() {
        let mut mask = blank(200, 300);
        imgproc::ellipse(
            &mut mask,
            Point::new(150, 100),
            core::Size::new(90, 35),
            0.0,
            0.0,
            360.0,
            Scalar::all(255.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        imgproc::ellipse(
            &mut mask,
            Point::new(150, 100),
            core::Size::new(60, 20),
            0.0,
            0.0,
            360.0,
            Scalar::all(0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        assert!(detect(&mask).is_empty());
    }

    #[test]
    fn test_two_rings_ranked_by_score() {
        let mut mask = blank(200, 400);
        draw_ring(&mut mask, 100, 100, 40, 26);
        draw_ring(&mut mask, 300, 100, 35, 20);
        let candidates = detect(&mask);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].score >= candidates[1].score);
    }
}
