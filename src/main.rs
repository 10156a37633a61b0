// src/main.rs

mod config;
mod contours;
mod detection;
mod detector;
mod frame_stats;
mod persistence;
mod segmentation;
mod thresholds;
mod types;
mod video_processor;

use anyhow::Result;
use config::ConfigWatcher;
use detector::{LogStatusSink, SignDetector};
use opencv::videoio::VideoWriterTrait;
use std::path::Path;
use tracing::{debug, error, info};
use video_processor::{draw_detections, VideoProcessor};

const CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Default)]
struct VideoStats {
    total_frames: u64,
    frames_with_detection: u64,
    confirmed_total: u64,
}

fn main() -> Result<()> {
    let mut watcher = ConfigWatcher::new(CONFIG_PATH)?;
    let config = watcher.current().clone();

    tracing_subscriber::fmt()
        .with_env_filter(format!("ring_sign_detector={}", config.logging.level))
        .init();

    info!("🚦 Ring Sign Detection System Starting");
    info!("✓ Configuration loaded");
    info!(
        "Detector options: profile={:?}, tightness={:?}, morph_open={}",
        config.detector.profile, config.detector.tightness, config.detector.morph_open
    );

    let video_processor = VideoProcessor::new(config.clone());
    let video_files = video_processor.find_video_files()?;

    if video_files.is_empty() {
        error!("No video files found in {}", config.video.input_dir);
        return Ok(());
    }

    let mut detector = SignDetector::new(Box::new(LogStatusSink))?;

    for (idx, video_path) in video_files.iter().enumerate() {
        info!("\n========================================");
        info!(
            "Processing video {}/{}: {}",
            idx + 1,
            video_files.len(),
            video_path.display()
        );
        info!("========================================\n");

        match process_video(video_path, &video_processor, &mut detector, &mut watcher) {
            Ok(stats) => {
                info!("\n✓ Video processed successfully!");
                info!("  Total frames: {}", stats.total_frames);
                info!(
                    "  Frames with confirmed sign: {} ({:.1}%)",
                    stats.frames_with_detection,
                    100.0 * stats.frames_with_detection as f64
                        / stats.total_frames.max(1) as f64
                );
                info!("  🛑 Confirmed detections: {}", stats.confirmed_total);
            }
            Err(e) => {
                error!("Failed to process {}: {e:#}", video_path.display());
            }
        }
    }

    Ok(())
}

fn process_video(
    path: &Path,
    video_processor: &VideoProcessor,
    detector: &mut SignDetector,
    watcher: &mut ConfigWatcher,
) -> Result<VideoStats> {
    let mut reader = video_processor.open_video(path)?;
    let mut writer =
        video_processor.create_writer(path, reader.width, reader.height, reader.fps)?;

    detector.start(reader.width, reader.height)?;

    let mut stats = VideoStats::default();

    while let Some(frame) = reader.read_frame()? {
        // Options are re-read every frame so config edits are hot
        let options = watcher.current().detector.options();
        let confirmed = detector.process_frame(&frame, &options);

        stats.total_frames += 1;
        if !confirmed.is_empty() {
            stats.frames_with_detection += 1;
            stats.confirmed_total += confirmed.len() as u64;
            debug!(
                frame = reader.current_frame,
                count = confirmed.len(),
                "confirmed sign(s)"
            );
        }

        if let Some(w) = writer.as_mut() {
            let annotated = draw_detections(&frame, &confirmed)?;
            w.write(&annotated)?;
        }

        if reader.current_frame % 300 == 0 {
            info!(
                "  {:.1}% ({}/{} frames, {} detections)",
                reader.progress(),
                reader.current_frame,
                reader.total_frames,
                stats.confirmed_total
            );
        }
    }

    detector.stop();
    Ok(stats)
}
