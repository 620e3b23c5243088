//! Two-pass bitrate budgeting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audio bitrate assumed by the budget when none is configured, in kbps.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 128;

/// Share of the target size available to the streams; the rest is container overhead.
const CONTAINER_OVERHEAD_FACTOR: f64 = 0.95;

const BITS_PER_MIB: f64 = 8.0 * 1024.0 * 1024.0;

/// Bitrates for a size-targeted encode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BitratePlan {
    /// Video bitrate in bits per second.
    pub video_bitrate_bps: u64,
    /// Audio bitrate the budget reserved, in kbps.
    pub audio_bitrate_kbps: u32,
    /// Requested output size in MiB.
    pub target_size_mb: f64,
}

/// Reasons a size target cannot be planned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BitratePlanError {
    /// Duration is zero, negative or unknown.
    #[error("Could not determine video duration")]
    InvalidDuration { duration_secs: f64 },

    /// The budget leaves no room for video.
    #[error("Target size too small for this video duration")]
    TargetTooSmall {
        target_size_mb: f64,
        duration_secs: f64,
    },
}

/// Computes the video bitrate that makes a file of `duration_secs` land near
/// `target_size_mb` MiB with an audio track at `audio_bitrate_kbps`.
///
/// `video = floor(mb * 8 * 1024 * 1024 * 0.95 / duration) - audio_kbps * 1024`
pub fn plan_two_pass(
    duration_secs: f64,
    target_size_mb: f64,
    audio_bitrate_kbps: u32,
) -> Result<BitratePlan, BitratePlanError> {
    if !(duration_secs > 0.0) || !duration_secs.is_finite() {
        return Err(BitratePlanError::InvalidDuration { duration_secs });
    }

    let target_bits = target_size_mb * BITS_PER_MIB * CONTAINER_OVERHEAD_FACTOR;
    let total_bps = (target_bits / duration_secs).floor();
    let video_bps = total_bps - f64::from(audio_bitrate_kbps) * 1024.0;

    if !(video_bps > 0.0) {
        return Err(BitratePlanError::TargetTooSmall {
            target_size_mb,
            duration_secs,
        });
    }

    Ok(BitratePlan {
        video_bitrate_bps: video_bps as u64,
        audio_bitrate_kbps,
        target_size_mb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_minutes_at_ten_megabytes() {
        let plan = plan_two_pass(120.0, 10.0, DEFAULT_AUDIO_BITRATE_KBPS).unwrap();
        assert_eq!(plan.video_bitrate_bps, 533_026);
        assert_eq!(plan.audio_bitrate_kbps, 128);
    }

    #[test]
    fn test_target_too_small() {
        assert!(matches!(
            plan_two_pass(600.0, 1.0, DEFAULT_AUDIO_BITRATE_KBPS),
            Err(BitratePlanError::TargetTooSmall { .. })
        ));
        assert!(matches!(
            plan_two_pass(60.0, 0.0, DEFAULT_AUDIO_BITRATE_KBPS),
            Err(BitratePlanError::TargetTooSmall { .. })
        ));
    }

    #[test]
    fn test_invalid_duration() {
        for duration in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                plan_two_pass(duration, 10.0, DEFAULT_AUDIO_BITRATE_KBPS),
                Err(BitratePlanError::InvalidDuration { .. })
            ));
        }
    }

    #[test]
    fn test_audio_bitrate_reduces_video_budget() {
        let with_default = plan_two_pass(60.0, 20.0, 128).unwrap();
        let with_more_audio = plan_two_pass(60.0, 20.0, 256).unwrap();
        assert_eq!(
            with_default.video_bitrate_bps - with_more_audio.video_bitrate_bps,
            128 * 1024
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            BitratePlanError::InvalidDuration { duration_secs: 0.0 }.to_string(),
            "Could not determine video duration"
        );
        assert_eq!(
            BitratePlanError::TargetTooSmall {
                target_size_mb: 1.0,
                duration_secs: 600.0
            }
            .to_string(),
            "Target size too small for this video duration"
        );
    }
}
