use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub detector: DetectorConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub profile: ProfileSetting,
    pub tightness: Tightness,
    pub morph_open: bool,
}

impl DetectorConfig {
    /// Snapshot of the hot-reloadable options consumed once per frame.
    pub fn options(&self) -> DetectorOptions {
        DetectorOptions {
            profile: self.profile,
            tightness: self.tightness,
            morph_open: self.morph_open,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub save_annotated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Operator-facing profile selection. `Auto` defers to the luma classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSetting {
    Auto,
    Day,
    Night,
}

/// Resolved lighting regime for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Day,
    Night,
}

/// Segmentation strictness, trading recall for precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tightness {
    Loose,
    Med,
    Tight,
    Ultra,
}

/// Per-frame detector options, re-read from config every processing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorOptions {
    pub profile: ProfileSetting,
    pub tightness: Tightness,
    pub morph_open: bool,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            profile: ProfileSetting::Auto,
            tightness: Tightness::Med,
            morph_open: false,
        }
    }
}

/// Sparse-sampled brightness/saturation/value summary of one frame.
/// Recomputed every frame, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub luma_mean: f32,
    pub saturation_mean: f32,
    pub value_mean: f32,
}

/// Adapted segmentation thresholds for one frame. Hue values are on
/// OpenCV's 0-179 scale; band 1 covers low hues, band 2 high hues
/// (red wraps around the hue origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdSet {
    pub hue_band1: [i32; 2],
    pub hue_band2: [i32; 2],
    pub saturation_min: i32,
    pub value_min: i32,
}

/// Base thresholds for one (profile, tightness) combination.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub hue_band1: [i32; 2],
    pub hue_band2: [i32; 2],
    pub saturation_min: i32,
    pub value_min: i32,
}

/// Reference frame statistics for a lighting profile, used only to
/// compute adaptation deltas.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub luma: f32,
    pub saturation: f32,
    pub value: f32,
}
