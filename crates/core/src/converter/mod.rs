//! Converter module for driving the external transcoding backend.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation.
//! A converter knows how to probe a file and how to run one structured
//! [`EncodeInvocation`]; deciding *which* invocations to run (CRF vs two-pass,
//! codec selection, filters) is the orchestrator's job.
//!
//! # Example
//!
//! ```ignore
//! use vidbatch_core::converter::{Converter, EncodeInvocation, FfmpegConverter, RateControl};
//! use vidbatch_core::CancelFlag;
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let info = converter.probe(Path::new("/videos/clip.mkv")).await?;
//! println!("Duration: {} seconds", info.duration_secs);
//!
//! let mut invocation = EncodeInvocation::new("clip", "/videos/clip.mkv", "/out/clip.mp4");
//! invocation.rate_control = Some(RateControl::Crf(23));
//! converter.encode(invocation, &CancelFlag::new()).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{
    AudioCodec, AudioSettings, EncodeInvocation, EncodeOutput, EncodeProgress, MediaInfo,
    OutputContainer, PassSpec, RateControl, Resolution, SpeedPreset, VideoCodec,
    VideoStreamInfo,
};
