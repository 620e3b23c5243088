//! Two-pass, size-targeted encoding.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::bitrate::BitratePlan;
use crate::cancel::CancelFlag;
use crate::converter::{
    AudioCodec, AudioSettings, Converter, ConverterError, EncodeInvocation, EncodeOutput,
    EncodeProgress, PassSpec, RateControl, VideoCodec,
};

/// File name prefix of the pass-log inside the scratch directory.
pub const PASS_LOG_NAME: &str = "ffmpeg2pass";

const SCRATCH_PREFIX: &str = "vidbatch-2pass-";

/// The platform null device used as first-pass output.
pub fn null_device() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

/// Errors from a two-pass encode.
#[derive(Debug, Error)]
pub enum TwoPassError {
    /// The pass-log scratch directory could not be created.
    #[error("Could not create pass-log directory: {0}")]
    Scratch(#[source] std::io::Error),

    /// The backend failed during pass `stage`.
    #[error("{}", backend_message(.stage, .source))]
    Backend { stage: u8, source: ConverterError },
}

impl TwoPassError {
    /// Whether the encode stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Backend { source, .. } if source.is_cancelled())
    }
}

fn backend_message(stage: &u8, source: &ConverterError) -> String {
    let label = if *stage == 1 { "First" } else { "Second" };
    format!("{} pass encoding error: {}", label, source.diagnostic())
}

/// Everything needed to run both passes for one file.
#[derive(Debug, Clone)]
pub struct TwoPassJob {
    /// Identifier used in logs and progress updates.
    pub job_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Codec pair for the container; `None` leaves codec choice to the backend.
    pub codecs: Option<(VideoCodec, AudioCodec)>,
    /// Video filter chain applied in both passes.
    pub filters: Vec<String>,
    pub plan: BitratePlan,
    /// Input duration, used for progress percentages.
    pub duration_secs: Option<f64>,
}

impl TwoPassJob {
    fn base_invocation(&self, output: PathBuf, pass: u8, log_path: &Path) -> EncodeInvocation {
        let mut invocation = EncodeInvocation::new(self.job_id.clone(), &self.input_path, output);
        invocation.video_codec = self.codecs.map(|(video, _)| video);
        invocation.rate_control = Some(RateControl::Bitrate {
            bps: self.plan.video_bitrate_bps,
        });
        invocation.filters = self.filters.clone();
        invocation.pass = Some(PassSpec {
            number: pass,
            log_path: log_path.to_path_buf(),
        });
        invocation.duration_secs = self.duration_secs;
        invocation
    }

    /// Analysis pass: no audio, output discarded.
    pub fn first_pass(&self, log_path: &Path) -> EncodeInvocation {
        let mut invocation = self.base_invocation(PathBuf::from(null_device()), 1, log_path);
        invocation.disable_audio = true;
        invocation.output_format = Some("null".to_string());
        invocation
    }

    /// Final pass: same bitrate and pass-log, with audio, real output.
    pub fn second_pass(&self, log_path: &Path) -> EncodeInvocation {
        let mut invocation = self.base_invocation(self.output_path.clone(), 2, log_path);
        invocation.audio = self.codecs.map(|(_, audio)| AudioSettings {
            codec: audio,
            bitrate_kbps: self.plan.audio_bitrate_kbps,
        });
        invocation
    }
}

/// Runs two-pass encodes with a private pass-log directory per job.
pub struct TwoPassEncoder<C: Converter> {
    converter: Arc<C>,
    scratch_root: PathBuf,
}

impl<C: Converter> TwoPassEncoder<C> {
    /// Creates an encoder whose scratch directories live under `scratch_root`.
    pub fn new(converter: Arc<C>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            converter,
            scratch_root: scratch_root.into(),
        }
    }

    /// Runs pass 1 then pass 2. Pass 2 never starts when pass 1 fails.
    ///
    /// The scratch directory is removed when this returns, whatever the outcome.
    pub async fn encode(
        &self,
        job: &TwoPassJob,
        cancel: &CancelFlag,
        progress_tx: Option<mpsc::Sender<EncodeProgress>>,
    ) -> Result<EncodeOutput, TwoPassError> {
        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(TwoPassError::Scratch)?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)
            .map_err(TwoPassError::Scratch)?;
        let log_path = scratch.path().join(PASS_LOG_NAME);

        debug!(
            job_id = %job.job_id,
            bitrate_bps = job.plan.video_bitrate_bps,
            scratch = %scratch.path().display(),
            "Starting two-pass encode"
        );

        self.run_pass(job.first_pass(&log_path), cancel, progress_tx.clone())
            .await
            .map_err(|source| TwoPassError::Backend { stage: 1, source })?;

        let output = self
            .run_pass(job.second_pass(&log_path), cancel, progress_tx)
            .await
            .map_err(|source| TwoPassError::Backend { stage: 2, source })?;

        info!(
            job_id = %job.job_id,
            output = %output.output_path.display(),
            target_size_mb = job.plan.target_size_mb,
            "Two-pass encode finished"
        );

        Ok(output)
    }

    async fn run_pass(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
        progress_tx: Option<mpsc::Sender<EncodeProgress>>,
    ) -> Result<EncodeOutput, ConverterError> {
        match progress_tx {
            Some(tx) => {
                self.converter
                    .encode_with_progress(invocation, cancel, tx)
                    .await
            }
            None => self.converter.encode(invocation, cancel).await,
        }
    }
}
