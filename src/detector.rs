// src/detector.rs
//
// Pipeline orchestrator: statistics -> thresholds -> segmentation ->
// contours -> ring strategies -> temporal confirmation, one frame at a
// time, in arrival order. A failing frame is reported and skipped; the
// loop itself never dies (better to miss one frame than to stop warning
// the driver).

use crate::contours::ContourSet;
use crate::detection::{default_strategies, ConfirmedSign, DetectorParams, RingStrategy};
use crate::frame_stats::sample_frame_stats;
use crate::persistence::PersistenceFilter;
use crate::segmentation::ColorSegmenter;
use crate::thresholds::{adapt, select_profile};
use crate::types::DetectorOptions;
use anyhow::Result;
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use tracing::{debug, info};

/// Human-readable operator feedback (loading/active/error). Never used for
/// control flow.
pub trait StatusSink {
    fn status(&mut self, message: &str);
}

/// Default sink routing status lines through the tracing logger.
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn status(&mut self, message: &str) {
        info!("{message}");
    }
}

pub struct SignDetector {
    params: DetectorParams,
    segmenter: ColorSegmenter,
    strategies: Vec<Box<dyn RingStrategy>>,
    persistence: PersistenceFilter,
    status: Box<dyn StatusSink>,
    running: bool,
    frame_size: Size,
}

impl SignDetector {
    pub fn new(status: Box<dyn StatusSink>) -> Result<Self> {
        Self::with_params(DetectorParams::default(), status)
    }

    pub fn with_params(params: DetectorParams, status: Box<dyn StatusSink>) -> Result<Self> {
        let persistence = PersistenceFilter::new(
            params.history_frames,
            params.confirm_hits,
            params.match_radius,
        );
        Ok(Self {
            segmenter: ColorSegmenter::new()?,
            strategies: default_strategies(),
            persistence,
            params,
            status,
            running: false,
            frame_size: Size::new(0, 0),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Allocate per-run buffers for the given frame dimensions, clear the
    /// detection history and begin accepting frames. Idempotent.
    pub fn start(&mut self, width: i32, height: i32) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.frame_size = Size::new(width, height);
        self.segmenter.allocate(width, height)?;
        self.persistence.reset();
        self.running = true;
        self.status.status("Sign detector active");
        Ok(())
    }

    /// Stop accepting frames and release all per-run buffers. Idempotent.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.segmenter.release();
        self.persistence.reset();
        self.status.status("Sign detector stopped");
    }

    /// Process one frame to completion and return the confirmed detections.
    ///
    /// Options are passed per call so config edits apply on the very next
    /// frame. Any pipeline error is caught here: the frame is dropped
    /// without touching the persistence window and the loop continues.
    pub fn process_frame(&mut self, frame: &Mat, options: &DetectorOptions) -> Vec<ConfirmedSign> {
        if !self.running {
            return Vec::new();
        }

        let (width, height) = (frame.cols(), frame.rows());
        if width <= 0 || height <= 0 {
            self.status.status("Frame source unavailable (zero-area frame), skipping");
            return Vec::new();
        }

        if width != self.frame_size.width || height != self.frame_size.height {
            // Camera switch: resize the arena, keep running
            debug!(
                "Frame dimensions changed {}x{} -> {}x{}",
                self.frame_size.width, self.frame_size.height, width, height
            );
            self.frame_size = Size::new(width, height);
            if let Err(e) = self.segmenter.allocate(width, height) {
                self.status.status(&format!("Buffer reallocation failed: {e:#}"));
                return Vec::new();
            }
        }

        match self.run_pipeline(frame, options) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                self.status.status(&format!("Frame processing error: {e:#}"));
                Vec::new()
            }
        }
    }

    fn run_pipeline(
        &mut self,
        frame: &Mat,
        options: &DetectorOptions,
    ) -> Result<Vec<ConfirmedSign>> {
        self.segmenter.prepare(frame)?;

        let stats = sample_frame_stats(frame, self.segmenter.hsv())?;
        let profile = select_profile(&stats, options.profile);
        let thresholds = adapt(&stats, profile, options.tightness);
        self.segmenter.segment(&thresholds, options.morph_open)?;

        let contours = ContourSet::extract(self.segmenter.mask())?;

        let mut candidates = Vec::new();
        for strategy in &self.strategies {
            candidates = strategy.detect(self.segmenter.mask(), &contours, &self.params)?;
            if !candidates.is_empty() {
                debug!(
                    strategy = strategy.name(),
                    count = candidates.len(),
                    "ring candidates"
                );
                break;
            }
        }

        Ok(self.persistence.observe(candidates))
    }

    /// Current binary red mask, exposed for debug visualization.
    pub fn mask(&self) -> &Mat {
        self.segmenter.mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SIGN_LABEL;
    use crate::types::{ProfileSetting, Tightness};
    use opencv::core::{self, Point, Scalar};
    use opencv::imgproc;

    struct NullSink;
    impl StatusSink for NullSink {
        fn status(&mut self, _message: &str) {}
    }

    fn detector() -> SignDetector {
        SignDetector::new(Box::new(NullSink)).unwrap()
    }

    fn day_options() -> DetectorOptions {
        DetectorOptions {
            profile: ProfileSetting::Day,
            tightness: Tightness::Med,
            morph_open: false,
        }
    }

    fn gray_frame(size: i32) -> Mat {
        Mat::new_rows_cols_with_default(size, size, core::CV_8UC3, Scalar::new(60.0, 60.0, 60.0, 0.0))
            .unwrap()
    }

    /// 200x200 gray frame with a red ring (outer radius 40, inner 26)
    /// centered at (100,100).
    fn ring_frame() -> Mat {
        let mut frame = gray_frame(200);
        imgproc::circle(
            &mut frame,
            Point::new(100, 100),
            40,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        imgproc::circle(
            &mut frame,
            Point::new(100, 100),
            26,
            Scalar::new(60.0, 60.0, 60.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        frame
    }

    #[test]
    fn test_not_running_processes_nothing() {
        let mut det = detector();
        assert!(det.process_frame(&ring_frame(), &day_options()).is_empty());
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut det = detector();
        det.start(200, 200).unwrap();
        det.start(200, 200).unwrap();
        assert!(det.is_running());
        det.stop();
        det.stop();
        assert!(!det.is_running());
    }

    #[test]
    fn test_zero_area_frame_skipped() {
        let mut det = detector();
        det.start(200, 200).unwrap();
        let empty = Mat::default();
        assert!(det.process_frame(&empty, &day_options()).is_empty());
        assert!(det.is_running());
    }

    #[test]
    fn test_no_red_means_empty_mask_and_no_detections() {
        let mut det = detector();
        det.start(200, 200).unwrap();
        for _ in 0..6 {
            let confirmed = det.process_frame(&gray_frame(200), &day_options());
            assert!(confirmed.is_empty());
        }
        assert_eq!(core::count_non_zero(det.mask()).unwrap(), 0);
    }

    #[test]
    fn test_sustained_ring_confirmed_on_fourth_frame() {
        let mut det = detector();
        det.start(200, 200).unwrap();
        let frame = ring_frame();

        let mut last = Vec::new();
        for _ in 0..4 {
            last = det.process_frame(&frame, &day_options());
        }

        assert_eq!(last.len(), 1);
        assert_eq!(last[0].label, SIGN_LABEL);
        let rect = last[0].rect;
        assert!((rect.x - 60).abs() <= 6, "x = {}", rect.x);
        assert!((rect.y - 60).abs() <= 6, "y = {}", rect.y);
        assert!((rect.width - 80).abs() <= 8, "w = {}", rect.width);
        assert!((rect.height - 80).abs() <= 8, "h = {}", rect.height);
    }

    #[test]
    fn test_single_flash_not_confirmed() {
        let mut det = detector();
        det.start(200, 200).unwrap();
        assert!(det.process_frame(&ring_frame(), &day_options()).is_empty());
        assert!(det.process_frame(&gray_frame(200), &day_options()).is_empty());
        assert!(det.process_frame(&gray_frame(200), &day_options()).is_empty());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        // Identical frame + identical options => identical output
        let frame = ring_frame();
        let run = || {
            let mut det = detector();
            det.start(200, 200).unwrap();
            let mut out = Vec::new();
            for _ in 0..4 {
                out = det.process_frame(&frame, &day_options());
            }
            out
        };
        let a = run();
        let b = run();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.rect, y.rect);
        }
    }

    #[test]
    fn test_stop_clears_history() {
        let mut det = detector();
        det.start(200, 200).unwrap();
        let frame = ring_frame();
        for _ in 0..3 {
            det.process_frame(&frame, &day_options());
        }
        det.stop();
        det.start(200, 200).unwrap();
        // History was cleared: first frame after restart cannot be confirmed
        assert!(det.process_frame(&frame, &day_options()).is_empty());
    }
}
