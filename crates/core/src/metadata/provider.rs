//! Metadata lookups backed by a converter's probe.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::file_info::FileInfo;
use super::video_info::VideoInfo;
use crate::converter::Converter;

/// Provides file and video metadata for template resolution and planning.
pub struct MetadataProvider<C: Converter> {
    converter: Arc<C>,
}

impl<C: Converter> Clone for MetadataProvider<C> {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
        }
    }
}

impl<C: Converter> MetadataProvider<C> {
    /// Creates a provider that probes through `converter`.
    pub fn new(converter: Arc<C>) -> Self {
        Self { converter }
    }

    /// Static file information. Never fails.
    pub fn file_info(&self, path: &Path) -> FileInfo {
        FileInfo::read(path)
    }

    /// Probes `path` for video information.
    ///
    /// Returns `None` when probing fails or the file has no video stream.
    pub async fn video_info(&self, path: &Path) -> Option<VideoInfo> {
        let media = match self.converter.probe(path).await {
            Ok(media) => media,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not probe video info");
                return None;
            }
        };

        let info = VideoInfo::from_media_info(&media);
        if info.is_none() {
            debug!(path = %path.display(), "No video stream found");
        }
        info
    }
}
