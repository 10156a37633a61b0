// src/segmentation.rs
//
// HSV color segmentation for red sign rims.
//
// Two inclusive hue ranges model red's wraparound at the hue origin; both
// are gated by the adapted saturation/value floors and OR-ed into one
// binary mask. A 5x5 elliptical closing bridges ring edges broken by glare.

use crate::types::ThresholdSet;
use anyhow::Result;
use opencv::core::{self, Mat, Point, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::*;

const BLUR_KERNEL: i32 = 5;
const MORPH_KERNEL: i32 = 5;

/// Owns the per-run segmentation buffers. OpenCV output Mats keep their
/// allocation between frames, so after the first frame this runs without
/// reallocating; `release` drops everything on stop.
pub struct ColorSegmenter {
    blurred: Mat,
    hsv: Mat,
    band_low: Mat,
    band_high: Mat,
    combined: Mat,
    mask: Mat,
    kernel: Mat,
}

impl ColorSegmenter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            blurred: Mat::default(),
            hsv: Mat::default(),
            band_low: Mat::default(),
            band_high: Mat::default(),
            combined: Mat::default(),
            mask: Mat::default(),
            kernel: imgproc::get_structuring_element(
                imgproc::MORPH_ELLIPSE,
                Size::new(MORPH_KERNEL, MORPH_KERNEL),
                Point::new(-1, -1),
            )?,
        })
    }

    /// Pre-size the working buffers for the given frame dimensions so the
    /// first frame does not pay the allocation cost mid-loop.
    pub fn allocate(&mut self, width: i32, height: i32) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Ok(());
        }
        self.mask = Mat::zeros(height, width, core::CV_8UC1)?.to_mat()?;
        Ok(())
    }

    /// Blur the frame and convert to HSV. Called once per frame before
    /// statistics sampling (which reads the HSV plane).
    pub fn prepare(&mut self, frame: &Mat) -> Result<()> {
        imgproc::gaussian_blur(
            frame,
            &mut self.blurred,
            Size::new(BLUR_KERNEL, BLUR_KERNEL),
            0.0,
            0.0,
            core::BORDER_DEFAULT,
        )?;
        imgproc::cvt_color(&self.blurred, &mut self.hsv, imgproc::COLOR_BGR2HSV, 0)?;
        Ok(())
    }

    /// Build the binary red mask from the adapted thresholds.
    ///
    /// `morph_open` adds an opening pass after the closing; it trades
    /// small-sign recall for robustness against the mask attaching to
    /// adjacent red objects, and is off by default.
    pub fn segment(&mut self, thresholds: &ThresholdSet, morph_open: bool) -> Result<()> {
        let s_min = thresholds.saturation_min as f64;
        let v_min = thresholds.value_min as f64;

        core::in_range(
            &self.hsv,
            &Scalar::new(thresholds.hue_band1[0] as f64, s_min, v_min, 0.0),
            &Scalar::new(thresholds.hue_band1[1] as f64, 255.0, 255.0, 0.0),
            &mut self.band_low,
        )?;
        core::in_range(
            &self.hsv,
            &Scalar::new(thresholds.hue_band2[0] as f64, s_min, v_min, 0.0),
            &Scalar::new(thresholds.hue_band2[1] as f64, 255.0, 255.0, 0.0),
            &mut self.band_high,
        )?;
        core::bitwise_or(
            &self.band_low,
            &self.band_high,
            &mut self.combined,
            &core::no_array(),
        )?;

        imgproc::morphology_ex(
            &self.combined,
            &mut self.mask,
            imgproc::MORPH_CLOSE,
            &self.kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;

        if morph_open {
            imgproc::morphology_ex(
                &self.mask,
                &mut self.combined,
                imgproc::MORPH_OPEN,
                &self.kernel,
                Point::new(-1, -1),
                1,
                core::BORDER_CONSTANT,
                imgproc::morphology_default_border_value()?,
            )?;
            std::mem::swap(&mut self.mask, &mut self.combined);
        }

        Ok(())
    }

    /// HSV plane of the current frame (valid after `prepare`).
    pub fn hsv(&self) -> &Mat {
        &self.hsv
    }

    /// Binary red mask of the current frame (valid after `segment`).
    pub fn mask(&self) -> &Mat {
        &self.mask
    }

    /// Drop all working buffers. Called on detector stop.
    pub fn release(&mut self) {
        self.blurred = Mat::default();
        self.hsv = Mat::default();
        self.band_low = Mat::default();
        self.band_high = Mat::default();
        self.combined = Mat::default();
        self.mask = Mat::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ThresholdSet {
        ThresholdSet {
            hue_band1: [0, 10],
            hue_band2: [170, 179],
            saturation_min: 80,
            value_min: 60,
        }
    }

    fn segment_solid(b: f64, g: f64, r: f64) -> i32 {
        let frame = Mat::new_rows_cols_with_default(
            80,
            80,
            core::CV_8UC3,
            Scalar::new(b, g, r, 0.0),
        )
        .unwrap();
        let mut seg = ColorSegmenter::new().unwrap();
        seg.prepare(&frame).unwrap();
        seg.segment(&thresholds(), false).unwrap();
        core::count_non_zero(seg.mask()).unwrap()
    }

    #[test]
    fn test_red_frame_fills_mask() {
        assert_eq!(segment_solid(0.0, 0.0, 255.0), 80 * 80);
    }

    #[test]
    fn test_blue_frame_empty_mask() {
        assert_eq!(segment_solid(255.0, 0.0, 0.0), 0);
    }

    #[test]
    fn test_dark_red_below_value_floor_rejected() {
        assert_eq!(segment_solid(0.0, 0.0, 40.0), 0);
    }

    #[test]
    fn test_closing_bridges_small_gap() {
        // Red frame with a 2px black slit; closing should fill it
        let mut frame = Mat::new_rows_cols_with_default(
            40,
            40,
            core::CV_8UC3,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
        )
        .unwrap();
        imgproc::line(
            &mut frame,
            Point::new(0, 20),
            Point::new(39, 20),
            Scalar::new(0.0, 0.0, 0.0, 0.0),
            1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let mut seg = ColorSegmenter::new().unwrap();
        seg.prepare(&frame).unwrap();
        seg.segment(&thresholds(), false).unwrap();
        // The interior of the slit row must be recovered by the closing
        let center = *seg.mask().at_2d::<u8>(20, 20).unwrap();
        assert_eq!(center, 255);
    }
}
