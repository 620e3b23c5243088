//! Quality presets.

use serde::Serialize;

use crate::converter::{Resolution, SpeedPreset};

/// Name of the preset used when a lookup misses.
pub const DEFAULT_QUALITY: &str = "medium";

/// CRF, speed and optional fixed resolution for a named quality level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityPreset {
    pub name: &'static str,
    /// Constant rate factor.
    pub crf: u8,
    pub speed: SpeedPreset,
    /// Fixed output size; `None` keeps the source size (rounded to even).
    pub resolution: Option<Resolution>,
}

const fn preset(
    name: &'static str,
    crf: u8,
    speed: SpeedPreset,
    resolution: Option<Resolution>,
) -> QualityPreset {
    QualityPreset {
        name,
        crf,
        speed,
        resolution,
    }
}

/// Every known preset.
pub const QUALITY_PRESETS: [QualityPreset; 13] = [
    preset("very_low", 35, SpeedPreset::Veryfast, None),
    preset("low", 28, SpeedPreset::Faster, None),
    preset("medium", 23, SpeedPreset::Medium, None),
    preset("high", 18, SpeedPreset::Slow, None),
    preset("very_high", 15, SpeedPreset::Veryslow, None),
    // Standard resolution presets
    preset("144p", 28, SpeedPreset::Faster, Some(Resolution::new(256, 144))),
    preset("240p", 26, SpeedPreset::Medium, Some(Resolution::new(426, 240))),
    preset("360p", 24, SpeedPreset::Medium, Some(Resolution::new(640, 360))),
    preset("480p", 22, SpeedPreset::Medium, Some(Resolution::new(854, 480))),
    preset("720p", 20, SpeedPreset::Medium, Some(Resolution::new(1280, 720))),
    preset("1080p", 18, SpeedPreset::Medium, Some(Resolution::new(1920, 1080))),
    preset("1440p", 16, SpeedPreset::Slow, Some(Resolution::new(2560, 1440))),
    preset("2160p", 15, SpeedPreset::Slow, Some(Resolution::new(3840, 2160))),
];

impl QualityPreset {
    /// Looks up a preset by exact name.
    pub fn lookup(name: &str) -> Option<&'static QualityPreset> {
        QUALITY_PRESETS.iter().find(|p| p.name == name)
    }

    /// Looks up a preset by name, falling back to `medium`.
    pub fn by_name(name: &str) -> &'static QualityPreset {
        Self::lookup(name).unwrap_or(&QUALITY_PRESETS[2])
    }

    /// All preset names in table order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        QUALITY_PRESETS.iter().map(|p| p.name)
    }
}
