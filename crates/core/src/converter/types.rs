//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Encoder speed/compression tradeoff (x264 naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl SpeedPreset {
    /// Returns the value passed to `-preset`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for SpeedPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video codec used for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC
    H264,
    /// VP9
    Vp9,
}

impl VideoCodec {
    /// Returns the ffmpeg encoder name for this codec.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Vp9 => "libvpx-vp9",
        }
    }
}

/// Audio codec used for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// Advanced Audio Coding
    Aac,
    /// Opus
    Opus,
}

impl AudioCodec {
    /// Returns the ffmpeg encoder name for this codec.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "libopus",
        }
    }
}

/// Output container, derived from the requested format or file extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum OutputContainer {
    #[default]
    Mp4,
    Mkv,
    Mov,
    Webm,
    /// Any other extension; encoded through the generic fallback.
    Other(String),
}

impl OutputContainer {
    /// Parses a format name or extension (leading dot and case are ignored).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "mp4" => Self::Mp4,
            "mkv" => Self::Mkv,
            "mov" => Self::Mov,
            "webm" => Self::Webm,
            _ => Self::Other(ext),
        }
    }

    /// Returns the file extension for this container (no dot).
    pub fn extension(&self) -> &str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Mov => "mov",
            Self::Webm => "webm",
            Self::Other(ext) => ext,
        }
    }

    /// Returns the video/audio codec pair, or `None` for the generic fallback.
    pub fn codecs(&self) -> Option<(VideoCodec, AudioCodec)> {
        match self {
            Self::Mp4 | Self::Mkv | Self::Mov => Some((VideoCodec::H264, AudioCodec::Aac)),
            Self::Webm => Some((VideoCodec::Vp9, AudioCodec::Opus)),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for OutputContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A fixed output resolution (`WIDTHxHEIGHT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("invalid resolution '{}', expected WIDTHxHEIGHT", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid width in '{}': {}", s, e))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid height in '{}': {}", s, e))?;
        Ok(Self { width, height })
    }
}

/// How the encoder controls output quality/size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// Constant Rate Factor (lower = better quality, larger output).
    Crf(u8),
    /// Average video bitrate in bits per second.
    Bitrate { bps: u64 },
}

/// Audio track settings for an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    pub codec: AudioCodec,
    pub bitrate_kbps: u32,
}

/// Two-pass parameters shared by both passes of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSpec {
    /// Pass number (1 or 2).
    pub number: u8,
    /// Pass-log file prefix passed to `-passlogfile`.
    pub log_path: PathBuf,
}

/// A single backend invocation.
///
/// This is the structured form of one ffmpeg command line; the converter
/// implementation decides how to render it.
#[derive(Debug, Clone)]
pub struct EncodeInvocation {
    /// Identifier used in logs and progress updates.
    pub job_id: String,
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path (the null device for analysis passes).
    pub output_path: PathBuf,
    /// Explicit video codec; `None` lets the backend choose.
    pub video_codec: Option<VideoCodec>,
    /// Explicit audio settings; `None` lets the backend choose.
    pub audio: Option<AudioSettings>,
    /// Drop the audio track entirely.
    pub disable_audio: bool,
    /// Quality or bitrate target.
    pub rate_control: Option<RateControl>,
    /// Encoder speed preset.
    pub speed: Option<SpeedPreset>,
    /// Video filter chain entries, joined with `,`.
    pub filters: Vec<String>,
    /// Two-pass parameters, if this is part of a two-pass encode.
    pub pass: Option<PassSpec>,
    /// Forced output format (e.g. `null`).
    pub output_format: Option<String>,
    /// Overwrite existing output.
    pub overwrite: bool,
    /// Known input duration, used to compute progress percentages.
    pub duration_secs: Option<f64>,
}

impl EncodeInvocation {
    /// Creates an invocation with no codec or filter settings.
    pub fn new(
        job_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            video_codec: None,
            audio: None,
            disable_audio: false,
            rate_control: None,
            speed: None,
            filters: Vec::new(),
            pass: None,
            output_format: None,
            overwrite: true,
            duration_secs: None,
        }
    }

    /// Whether the output is discarded (analysis pass).
    pub fn writes_output(&self) -> bool {
        self.output_format.as_deref() != Some("null")
    }
}

/// Result of a successful backend invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeOutput {
    /// Job ID.
    pub job_id: String,
    /// Output file path.
    pub output_path: PathBuf,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Progress update during an invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeProgress {
    /// Job ID.
    pub job_id: String,
    /// Two-pass stage this update belongs to, if any.
    pub pass: Option<u8>,
    /// Progress percentage of this invocation (0.0 - 100.0).
    pub percent: f32,
    /// Current processing time in seconds.
    pub time_secs: f64,
    /// Total input duration in seconds, if known.
    pub duration_secs: Option<f64>,
    /// Current processing speed (e.g., "1.5x").
    pub speed: Option<String>,
}

/// The first video stream of a probed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    /// Codec name (e.g. "h264"), "unknown" when absent.
    pub codec: String,
    pub width: u32,
    pub height: u32,
    /// Average frame rate as reported, e.g. "30000/1001".
    pub avg_frame_rate: String,
}

/// Information about a media file as reported by the probe backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: PathBuf,
    /// Container size in bytes (0 when not reported).
    pub size_bytes: u64,
    /// Duration in seconds (0 when not reported).
    pub duration_secs: f64,
    /// Container bit rate in bits per second (0 when not reported).
    pub bitrate_bps: u64,
    /// Container format (e.g., "matroska", "mov").
    pub format: String,
    /// First video stream, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoStreamInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_from_extension() {
        assert_eq!(OutputContainer::from_extension("mp4"), OutputContainer::Mp4);
        assert_eq!(OutputContainer::from_extension(".MKV"), OutputContainer::Mkv);
        assert_eq!(OutputContainer::from_extension("webm"), OutputContainer::Webm);
        assert_eq!(
            OutputContainer::from_extension("avi"),
            OutputContainer::Other("avi".to_string())
        );
    }

    #[test]
    fn test_container_codecs() {
        for container in [OutputContainer::Mp4, OutputContainer::Mkv, OutputContainer::Mov] {
            assert_eq!(container.codecs(), Some((VideoCodec::H264, AudioCodec::Aac)));
        }
        assert_eq!(
            OutputContainer::Webm.codecs(),
            Some((VideoCodec::Vp9, AudioCodec::Opus))
        );
        assert_eq!(OutputContainer::from_extension("avi").codecs(), None);
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(VideoCodec::H264.ffmpeg_codec(), "libx264");
        assert_eq!(VideoCodec::Vp9.ffmpeg_codec(), "libvpx-vp9");
        assert_eq!(AudioCodec::Aac.ffmpeg_codec(), "aac");
        assert_eq!(AudioCodec::Opus.ffmpeg_codec(), "libopus");
    }

    #[test]
    fn test_resolution_parse() {
        let res: Resolution = "1280x720".parse().unwrap();
        assert_eq!(res, Resolution::new(1280, 720));
        assert_eq!(res.to_string(), "1280x720");
        assert!("1280".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_null_output_detection() {
        let mut invocation = EncodeInvocation::new("job", "/in.mp4", "/dev/null");
        assert!(invocation.writes_output());
        invocation.output_format = Some("null".to_string());
        assert!(!invocation.writes_output());
    }
}
