//! File and video metadata used by filename templates and the orchestrator.
//!
//! Static file information ([`FileInfo`]) is read straight from the
//! filesystem and never fails. Stream information ([`VideoInfo`]) comes from
//! the converter's probe and is optional: callers degrade to defaults when it
//! is unavailable.

mod file_info;
mod provider;
mod video_info;

pub use file_info::{format_rounded, FileInfo};
pub use provider::MetadataProvider;
pub use video_info::{parse_frame_rate, VideoInfo};
