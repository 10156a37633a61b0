// src/thresholds.rs
//
// Day/night profile selection and per-frame threshold adaptation.
//
// Eight fixed presets (profile x tightness) define the base hue bands and
// saturation/value floors; a pair of anchor statistics per profile lets the
// floors flex with scene lighting. The hue gate itself never adapts: what
// counts as "red" stays fixed, only the sensitivity moves.

use crate::types::{Anchor, FrameStats, Preset, Profile, ProfileSetting, ThresholdSet, Tightness};

/// Mean luma below which `auto` classifies the scene as night.
const NIGHT_LUMA_CUTOFF: f32 = 105.0;

/// Divisor normalizing anchor-minus-observed deltas before clamping to [-1, 1].
const DELTA_SCALE: f32 = 80.0;

const SATURATION_MIN_RANGE: [i32; 2] = [40, 200];
const VALUE_MIN_RANGE: [i32; 2] = [10, 200];

// Hue values are OpenCV 0-179. Band 1 is the low side of red, band 2 the
// wraparound high side; night presets widen the bands and drop the floors
// to cope with headlight glare and underexposure.
const DAY_PRESETS: [Preset; 4] = [
    // loose
    Preset { hue_band1: [0, 12], hue_band2: [168, 179], saturation_min: 70, value_min: 60 },
    // med
    Preset { hue_band1: [0, 10], hue_band2: [170, 179], saturation_min: 90, value_min: 80 },
    // tight
    Preset { hue_band1: [0, 8], hue_band2: [172, 179], saturation_min: 110, value_min: 100 },
    // ultra
    Preset { hue_band1: [0, 6], hue_band2: [174, 179], saturation_min: 130, value_min: 120 },
];

const NIGHT_PRESETS: [Preset; 4] = [
    // loose
    Preset { hue_band1: [0, 14], hue_band2: [166, 179], saturation_min: 50, value_min: 30 },
    // med
    Preset { hue_band1: [0, 12], hue_band2: [168, 179], saturation_min: 65, value_min: 40 },
    // tight
    Preset { hue_band1: [0, 10], hue_band2: [170, 179], saturation_min: 85, value_min: 55 },
    // ultra
    Preset { hue_band1: [0, 8], hue_band2: [172, 179], saturation_min: 100, value_min: 70 },
];

const DAY_ANCHOR: Anchor = Anchor { luma: 150.0, saturation: 90.0, value: 160.0 };
const NIGHT_ANCHOR: Anchor = Anchor { luma: 60.0, saturation: 70.0, value: 80.0 };

pub fn preset_for(profile: Profile, tightness: Tightness) -> Preset {
    let table = match profile {
        Profile::Day => &DAY_PRESETS,
        Profile::Night => &NIGHT_PRESETS,
    };
    let idx = match tightness {
        Tightness::Loose => 0,
        Tightness::Med => 1,
        Tightness::Tight => 2,
        Tightness::Ultra => 3,
    };
    table[idx]
}

pub fn anchor_for(profile: Profile) -> Anchor {
    match profile {
        Profile::Day => DAY_ANCHOR,
        Profile::Night => NIGHT_ANCHOR,
    }
}

/// Resolve the lighting profile for this frame. A forced setting is honored
/// as-is; `auto` classifies by mean luma.
pub fn select_profile(stats: &FrameStats, setting: ProfileSetting) -> Profile {
    match setting {
        ProfileSetting::Day => Profile::Day,
        ProfileSetting::Night => Profile::Night,
        ProfileSetting::Auto => {
            if stats.luma_mean < NIGHT_LUMA_CUTOFF {
                Profile::Night
            } else {
                Profile::Day
            }
        }
    }
}

/// Adapt the preset's saturation/value floors to the observed frame stats.
///
/// A scene darker or less saturated than the profile's anchor lowers the
/// floors (more recall); a brighter one raises them (more precision). Hue
/// bands are copied from the preset unmodified.
pub fn adapt(stats: &FrameStats, profile: Profile, tightness: Tightness) -> ThresholdSet {
    let preset = preset_for(profile, tightness);
    let anchor = anchor_for(profile);

    let d_luma = ((anchor.luma - stats.luma_mean) / DELTA_SCALE).clamp(-1.0, 1.0);
    let d_sat = ((anchor.saturation - stats.saturation_mean) / DELTA_SCALE).clamp(-1.0, 1.0);
    let d_val = ((anchor.value - stats.value_mean) / DELTA_SCALE).clamp(-1.0, 1.0);

    let saturation_min = preset.saturation_min - (18.0 * d_sat + 8.0 * d_luma).round() as i32;
    let value_min = preset.value_min - (20.0 * d_luma + 8.0 * d_val).round() as i32;

    ThresholdSet {
        hue_band1: preset.hue_band1,
        hue_band2: preset.hue_band2,
        saturation_min: saturation_min.clamp(SATURATION_MIN_RANGE[0], SATURATION_MIN_RANGE[1]),
        value_min: value_min.clamp(VALUE_MIN_RANGE[0], VALUE_MIN_RANGE[1]),
    }
}
