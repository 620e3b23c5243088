//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`Converter`](crate::converter::Converter),
//! allowing orchestrator and planner tests to run without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use vidbatch_core::testing::{fixtures, MockConverter};
//!
//! let converter = MockConverter::new();
//!
//! // Configure mock responses
//! converter.set_probe_result("/videos/a.mp4", fixtures::media_info("/videos/a.mp4", 90.0)).await;
//! converter.set_encode_failure("/videos/b.mp4", "Invalid data found").await;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedInvocation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::converter::{MediaInfo, VideoStreamInfo};

    /// Create a 1080p/30fps h264 probe result with the given duration.
    pub fn media_info(path: impl AsRef<Path>, duration_secs: f64) -> MediaInfo {
        video_media_info(path, duration_secs, 1920, 1080, "30/1")
    }

    /// Create a probe result with an explicit video stream shape.
    pub fn video_media_info(
        path: impl AsRef<Path>,
        duration_secs: f64,
        width: u32,
        height: u32,
        avg_frame_rate: &str,
    ) -> MediaInfo {
        MediaInfo {
            path: path.as_ref().to_path_buf(),
            size_bytes: 50 * 1024 * 1024, // 50 MB
            duration_secs,
            bitrate_bps: 4_000_000,
            format: "mov".to_string(),
            video: Some(VideoStreamInfo {
                codec: "h264".to_string(),
                width,
                height,
                avg_frame_rate: avg_frame_rate.to_string(),
            }),
        }
    }

    /// Create placeholder input files under `dir` and return their paths.
    pub fn touch_inputs(dir: &Path, names: &[&str]) -> std::io::Result<Vec<PathBuf>> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, b"fake video data")?;
                Ok(path)
            })
            .collect()
    }
}
