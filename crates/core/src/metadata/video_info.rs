//! Probed video stream information.

use serde::{Deserialize, Serialize};

use crate::converter::MediaInfo;

/// Video properties of a probed file.
///
/// Computed on demand for each request; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Container bit rate in bits per second.
    pub bitrate_bps: u64,
    pub size_bytes: u64,
    /// Video codec name, e.g. "h264".
    pub codec: String,
    /// Frames per second, 0 when unknown.
    pub fps: f64,
}

impl VideoInfo {
    /// Extracts video information from a probe result.
    ///
    /// Returns `None` when the file has no video stream.
    pub fn from_media_info(info: &MediaInfo) -> Option<Self> {
        let video = info.video.as_ref()?;
        Some(Self {
            width: video.width,
            height: video.height,
            duration_secs: info.duration_secs.max(0.0),
            bitrate_bps: info.bitrate_bps,
            size_bytes: info.size_bytes,
            codec: video.codec.clone(),
            fps: parse_frame_rate(&video.avg_frame_rate),
        })
    }

    /// Resolution rendered as `WIDTHxHEIGHT`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Parses a frame rate given as `N/D` or as a plain decimal.
///
/// Returns 0 for a zero denominator or malformed input.
pub fn parse_frame_rate(rate: &str) -> f64 {
    let rate = rate.trim();
    let parsed = match rate.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            (Ok(num), Ok(den)) if den != 0.0 => num / den,
            _ => 0.0,
        },
        None => rate.parse::<f64>().unwrap_or(0.0),
    };

    if parsed.is_finite() && parsed > 0.0 {
        parsed
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::VideoStreamInfo;
    use std::path::PathBuf;

    fn media_info(video: Option<VideoStreamInfo>) -> MediaInfo {
        MediaInfo {
            path: PathBuf::from("/videos/clip.mp4"),
            size_bytes: 10 * 1024 * 1024,
            duration_secs: 65.04,
            bitrate_bps: 1_290_000,
            format: "mov".to_string(),
            video,
        }
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25/1"), 25.0);
        assert_eq!(parse_frame_rate("24"), 24.0);
        assert_eq!(parse_frame_rate("23.976"), 23.976);
        assert_eq!(parse_frame_rate("0/0"), 0.0);
        assert_eq!(parse_frame_rate("30/0"), 0.0);
        assert_eq!(parse_frame_rate("abc"), 0.0);
        assert_eq!(parse_frame_rate(""), 0.0);
    }

    #[test]
    fn test_from_media_info() {
        let info = media_info(Some(VideoStreamInfo {
            codec: "hevc".to_string(),
            width: 1920,
            height: 1080,
            avg_frame_rate: "50/1".to_string(),
        }));

        let video = VideoInfo::from_media_info(&info).unwrap();
        assert_eq!(video.resolution(), "1920x1080");
        assert_eq!(video.codec, "hevc");
        assert_eq!(video.fps, 50.0);
        assert_eq!(video.duration_secs, 65.04);
        assert_eq!(video.bitrate_bps, 1_290_000);
    }

    #[test]
    fn test_from_media_info_without_video() {
        assert!(VideoInfo::from_media_info(&media_info(None)).is_none());
    }
}
