// src/detection/circle_fit.rs
//
// Fallback ring detector: minimal enclosing circle + annulus sampling.
//
// Runs only when the hierarchy test finds nothing, which happens when the
// ring's hole is lost (glare, partial occlusion, the hierarchy collapsing
// into a single contour). Instead of topology it scores redness directly:
// the annulus around the fitted circle must be mostly red while the center
// disk must not be, i.e. a hollow red ring rather than a solid blob.

use super::types::{rank_and_cap, DetectorParams, RingCandidate};
use super::RingStrategy;
use crate::contours::ContourSet;
use anyhow::Result;
use opencv::core::{Mat, Point2f, Rect};
use opencv::imgproc;
use opencv::prelude::*;

pub struct CircleFitStrategy;

impl RingStrategy for CircleFitStrategy {
    fn name(&self) -> &'static str {
        "circle-fit"
    }

    fn detect(
        &self,
        mask: &Mat,
        contours: &ContourSet,
        params: &DetectorParams,
    ) -> Result<Vec<RingCandidate>> {
        let mut candidates = Vec::new();

        for idx in 0..contours.len() {
            let contour = contours.contour(idx)?;
            let area = imgproc::contour_area(&contour, false)?;
            if area < params.min_contour_area {
                continue;
            }

            let mut center = Point2f::default();
            let mut radius = 0f32;
            imgproc::min_enclosing_circle(&contour, &mut center, &mut radius)?;
            if radius < params.min_circle_radius {
                continue;
            }

            let ring_frac = annulus_fraction(mask, center, radius, params)?;
            if ring_frac < params.min_ring_fraction {
                continue;
            }

            let disk_radius = (radius * params.center_disk_ratio).round() as i32;
            let center_frac = disk_fraction(mask, center, disk_radius)?;
            if center_frac > params.max_center_fraction {
                continue;
            }

            candidates.push(RingCandidate {
                rect: circle_bbox(center, radius, mask.cols(), mask.rows()),
                center_x: center.x,
                center_y: center.y,
                score: ring_frac - center_frac,
            });
        }

        Ok(rank_and_cap(candidates, params.max_candidates))
    }
}

/// Fraction of red samples along the annulus `radius -/+ thickness`,
/// sampled at `annulus_angles` angular positions x 3 radial steps.
fn annulus_fraction(
    mask: &Mat,
    center: Point2f,
    radius: f32,
    params: &DetectorParams,
) -> Result<f32> {
    let thickness = (radius * params.annulus_thickness_ratio).round().max(2.0);

    // The fitted circle encloses the outermost rim pixels, so its radius
    // sits about half a pixel outside the rasterized band. Sample from just
    // inside to keep the middle step on pixel centers of the rim.
    let base = radius - 0.5;

    let mut total = 0u32;
    let mut red = 0u32;

    for k in 0..params.annulus_angles {
        let theta = 2.0 * std::f32::consts::PI * k as f32 / params.annulus_angles as f32;
        let (sin, cos) = theta.sin_cos();
        for step in [-1.0f32, 0.0, 1.0] {
            let r = base + step * thickness;
            let x = (center.x + r * cos).round() as i32;
            let y = (center.y + r * sin).round() as i32;
            if let Some(on) = sample(mask, x, y)? {
                total += 1;
                if on {
                    red += 1;
                }
            }
        }
    }

    if total == 0 {
        return Ok(0.0);
    }
    Ok(red as f32 / total as f32)
}

/// Fraction of red samples on an axis-aligned grid inside the disk of
/// `disk_radius` around the center. Grid spacing scales with the radius.
fn disk_fraction(mask: &Mat, center: Point2f, disk_radius: i32) -> Result<f32> {
    if disk_radius <= 0 {
        return Ok(0.0);
    }
    let spacing = ((disk_radius as f32 / 6.0).round() as i32).max(2);

    let mut total = 0u32;
    let mut red = 0u32;

    let mut dy = -disk_radius;
    while dy <= disk_radius {
        let mut dx = -disk_radius;
        while dx <= disk_radius {
            if dx * dx + dy * dy <= disk_radius * disk_radius {
                let x = center.x.round() as i32 + dx;
                let y = center.y.round() as i32 + dy;
                if let Some(on) = sample(mask, x, y)? {
                    total += 1;
                    if on {
                        red += 1;
                    }
                }
            }
            dx += spacing;
        }
        dy += spacing;
    }

    if total == 0 {
        return Ok(0.0);
    }
    Ok(red as f32 / total as f32)
}

/// Mask lookup with bounds check; `None` for out-of-frame samples.
fn sample(mask: &Mat, x: i32, y: i32) -> Result<Option<bool>> {
    if x < 0 || y < 0 || x >= mask.cols() || y >= mask.rows() {
        return Ok(None);
    }
    Ok(Some(*mask.at_2d::<u8>(y, x)? > 0))
}

/// Axis-aligned bounding box of the circle, clamped to frame bounds.
fn circle_bbox(center: Point2f, radius: f32, width: i32, height: i32) -> Rect {
    let x0 = ((center.x - radius).floor() as i32).clamp(0, width.saturating_sub(1));
    let y0 = ((center.y - radius).floor() as i32).clamp(0, height.saturating_sub(1));
    let x1 = ((center.x + radius).ceil() as i32).clamp(0, width);
    let y1 = ((center.y + radius).ceil() as i32).clamp(0, height);
    Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{self, Point, Scalar};

    fn blank(rows: i32, cols: i32) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC1, Scalar::all(0.0)).unwrap()
    }

    fn draw_disk(mask: &mut Mat, cx: i32, cy: i32, r: i32, value: f64) {
        imgproc::circle(
            mask,
            Point::new(cx, cy),
            r,
            Scalar::all(value),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
    }

    fn detect(mask: &Mat) -> Vec<RingCandidate> {
        let contours = ContourSet::extract(mask).unwrap();
        CircleFitStrategy
            .detect(mask, &contours, &DetectorParams::default())
            .unwrap()
    }

    #[test]
    fn test_hollow_ring_accepted() {
        let mut mask = blank(200, 200);
        draw_disk(&mut mask, 100, 100, 40, 255.0);
        draw_disk(&mut mask, 100, 100, 26, 0.0);

        let candidates = detect(&mask);
        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert!((best.center_x - 100.0).abs() <= 2.0);
        assert!((best.center_y - 100.0).abs() <= 2.0);
        assert!((best.rect.width - 80).abs() <= 4);
    }

    #[test]
    fn test_solid_disk_rejected_by_center_fraction() {
        let mut mask = blank(200, 200);
        draw_disk(&mut mask, 100, 100, 40, 255.0);
        assert!(detect(&mask).is_empty());
    }

    #[test]
    fn test_small_circle_below_radius_floor_rejected() {
        // Area ~900 passes the area gate, but the fitted radius 17 < 18
        let mut mask = blank(100, 100);
        draw_disk(&mut mask, 50, 50, 17, 255.0);
        assert!(detect(&mask).is_empty());
    }

    #[test]
    fn test_ring_near_frame_edge_stays_in_bounds() {
        let mut mask = blank(120, 120);
        draw_disk(&mut mask, 30, 30, 28, 255.0);
        draw_disk(&mut mask, 30, 30, 18, 0.0);

        let candidates = detect(&mask);
        assert!(!candidates.is_empty());
        let rect = candidates[0].rect;
        assert!(rect.x >= 0 && rect.y >= 0);
        assert!(rect.x + rect.width <= 120);
        assert!(rect.y + rect.height <= 120);
    }

    #[test]
    fn test_score_is_ring_minus_center_fraction() {
        let mut mask = blank(200, 200);
        draw_disk(&mut mask, 100, 100, 40, 255.0);
        draw_disk(&mut mask, 100, 100, 26, 0.0);

        let candidates = detect(&mask);
        assert!(!candidates.is_empty());
        // Clean synthetic ring: annulus mostly red, center empty
        assert!(candidates[0].score > 0.5);
    }
}
