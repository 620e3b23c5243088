//! Bitrate planning and two-pass encoding.
//!
//! [`plan_two_pass`] turns a duration and a target size into a video bitrate;
//! [`TwoPassEncoder`] runs the analysis and final passes against a converter
//! with a scoped pass-log directory.

mod bitrate;
mod two_pass;

pub use bitrate::{plan_two_pass, BitratePlan, BitratePlanError, DEFAULT_AUDIO_BITRATE_KBPS};
pub use two_pass::{null_device, TwoPassEncoder, TwoPassError, TwoPassJob, PASS_LOG_NAME};
