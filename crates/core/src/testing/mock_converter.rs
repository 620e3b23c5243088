//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::cancel::CancelFlag;
use crate::converter::{
    Converter, ConverterError, EncodeInvocation, EncodeOutput, EncodeProgress, MediaInfo,
};

use super::fixtures;

/// Granularity of cancel checks during a simulated encode.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(5);

/// A recorded encoder invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// The invocation that was submitted.
    pub invocation: EncodeInvocation,
    /// Whether the invocation succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track invocations for assertions
/// - Simulate failures globally, per input or per two-pass stage
/// - Control probe results
/// - Simulate progress updates and cancellable encode time
///
/// Successful encodes that write output create the output file, so collision
/// handling sees them like real results. First passes create a pass-log file
/// next to the configured pass-log prefix.
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded invocations.
    invocations: Arc<RwLock<Vec<RecordedInvocation>>>,
    /// Pre-configured probe results by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, MediaInfo>>>,
    /// Paths whose probe fails.
    probe_failures: Arc<RwLock<HashMap<PathBuf, String>>>,
    /// Inputs whose encodes fail, with the stderr to report.
    encode_failures: Arc<RwLock<HashMap<PathBuf, String>>>,
    /// Two-pass stages that fail, with the stderr to report.
    pass_failures: Arc<RwLock<HashMap<u8, String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated encode duration.
    encode_duration: Arc<RwLock<Duration>>,
    /// Default media info for probing unknown files.
    default_media_info: Arc<RwLock<Option<MediaInfo>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            probe_failures: Arc::new(RwLock::new(HashMap::new())),
            encode_failures: Arc::new(RwLock::new(HashMap::new())),
            pass_failures: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            encode_duration: Arc::new(RwLock::new(Duration::ZERO)),
            default_media_info: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded invocations.
    pub async fn recorded_invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.read().await.clone()
    }

    /// Get the number of invocations performed.
    pub async fn invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }

    /// Clear recorded invocations.
    pub async fn clear_recorded(&self) {
        self.invocations.write().await.clear();
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: MediaInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Make probing a specific path fail.
    pub async fn set_probe_failure(&self, path: impl AsRef<Path>, reason: impl Into<String>) {
        self.probe_failures
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), reason.into());
    }

    /// Set the default media info for probing unknown files.
    pub async fn set_default_media_info(&self, info: MediaInfo) {
        *self.default_media_info.write().await = Some(info);
    }

    /// Make every encode of `input` fail with `stderr` as the diagnostic.
    pub async fn set_encode_failure(&self, input: impl AsRef<Path>, stderr: impl Into<String>) {
        self.encode_failures
            .write()
            .await
            .insert(input.as_ref().to_path_buf(), stderr.into());
    }

    /// Make every invocation of two-pass stage `pass` fail.
    pub async fn set_pass_failure(&self, pass: u8, stderr: impl Into<String>) {
        self.pass_failures.write().await.insert(pass, stderr.into());
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Set the simulated encode duration.
    pub async fn set_encode_duration(&self, duration: Duration) {
        *self.encode_duration.write().await = duration;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, invocation: EncodeInvocation, success: bool) {
        self.invocations
            .write()
            .await
            .push(RecordedInvocation { invocation, success });
    }

    /// Configured failure for this invocation, if any.
    async fn configured_failure(&self, invocation: &EncodeInvocation) -> Option<ConverterError> {
        if let Some(err) = self.take_error().await {
            return Some(err);
        }

        if let Some(stderr) = self.encode_failures.read().await.get(&invocation.input_path) {
            return Some(ConverterError::encode_failed(
                "FFmpeg exited with code: Some(1)",
                Some(stderr.clone()),
            ));
        }

        let pass = invocation.pass.as_ref().map(|p| p.number)?;
        self.pass_failures.read().await.get(&pass).map(|stderr| {
            ConverterError::encode_failed("FFmpeg exited with code: Some(1)", Some(stderr.clone()))
        })
    }

    /// Sleeps for the configured encode duration, returning early on cancel.
    async fn simulate_work(&self, cancel: &CancelFlag) -> Result<(), ConverterError> {
        let mut remaining = *self.encode_duration.read().await;
        loop {
            if cancel.is_cancelled() {
                return Err(ConverterError::Cancelled);
            }
            if remaining.is_zero() {
                return Ok(());
            }
            let step = remaining.min(CANCEL_CHECK_INTERVAL);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }

    /// Writes the files a real backend would leave behind.
    async fn write_artifacts(invocation: &EncodeInvocation) -> Result<(), ConverterError> {
        if let Some(ref pass) = invocation.pass {
            if pass.number == 1 {
                let log = PathBuf::from(format!("{}-0.log", pass.log_path.to_string_lossy()));
                tokio::fs::write(&log, b"mock pass log").await?;
            }
        }

        if invocation.writes_output() {
            if let Some(parent) = invocation.output_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|_| {
                        ConverterError::OutputDirectoryFailed {
                            path: parent.to_path_buf(),
                        }
                    })?;
                }
            }
            tokio::fs::write(&invocation.output_path, b"mock encoded video").await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(reason) = self.probe_failures.read().await.get(path) {
            return Err(ConverterError::probe_failed(reason.clone()));
        }

        // Check for pre-configured result
        if let Some(info) = self.probe_results.read().await.get(path) {
            return Ok(info.clone());
        }

        // Check for default media info
        if let Some(info) = self.default_media_info.read().await.as_ref() {
            let mut info = info.clone();
            info.path = path.to_path_buf();
            return Ok(info);
        }

        Ok(fixtures::media_info(path, 120.0))
    }

    async fn encode(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
    ) -> Result<EncodeOutput, ConverterError> {
        if let Some(err) = self.configured_failure(&invocation).await {
            self.record(invocation, false).await;
            return Err(err);
        }

        if let Err(err) = self.simulate_work(cancel).await {
            self.record(invocation, false).await;
            return Err(err);
        }

        if let Err(err) = Self::write_artifacts(&invocation).await {
            self.record(invocation, false).await;
            return Err(err);
        }

        let output = EncodeOutput {
            job_id: invocation.job_id.clone(),
            output_path: invocation.output_path.clone(),
            duration_ms: self.encode_duration.read().await.as_millis() as u64,
        };
        self.record(invocation, true).await;
        Ok(output)
    }

    async fn encode_with_progress(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
        progress_tx: mpsc::Sender<EncodeProgress>,
    ) -> Result<EncodeOutput, ConverterError> {
        let pass = invocation.pass.as_ref().map(|p| p.number);
        for percent in [25.0f32, 50.0, 75.0, 100.0] {
            let time_secs = invocation
                .duration_secs
                .map(|d| d * percent as f64 / 100.0)
                .unwrap_or(0.0);
            // Non-blocking send
            let _ = progress_tx.try_send(EncodeProgress {
                job_id: invocation.job_id.clone(),
                pass,
                percent,
                time_secs,
                duration_secs: invocation.duration_secs,
                speed: Some("10x".to_string()),
            });
        }

        self.encode(invocation, cancel).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::PassSpec;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_encode_writes_output() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        let output = dir.path().join("nested/out.mp4");

        let invocation = EncodeInvocation::new("job-1", "/in.mp4", &output);
        let result = converter.encode(invocation, &CancelFlag::new()).await.unwrap();

        assert_eq!(result.job_id, "job-1");
        assert!(output.exists());
        assert_eq!(converter.invocation_count().await, 1);
    }

    #[tokio::test]
    async fn test_default_probe() {
        let converter = MockConverter::new();
        let info = converter.probe(Path::new("/test/video.mkv")).await.unwrap();
        let video = info.video.unwrap();
        assert_eq!(video.width, 1920);
        assert_eq!(video.avg_frame_rate, "30/1");
    }

    #[tokio::test]
    async fn test_error_injection() {
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::encode_failed("test error", None))
            .await;

        let invocation = EncodeInvocation::new("fail", "/in.mp4", "/out.mp4");
        let result = converter.encode(invocation, &CancelFlag::new()).await;
        assert!(result.is_err());

        // Error should be consumed, invocation recorded as failed
        let recorded = converter.recorded_invocations().await;
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].success);
    }

    #[tokio::test]
    async fn test_pass_failure_only_hits_that_pass() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter.set_pass_failure(2, "rate control error").await;

        let mut first = EncodeInvocation::new("job", "/in.mp4", "/dev/null");
        first.output_format = Some("null".to_string());
        first.pass = Some(PassSpec {
            number: 1,
            log_path: dir.path().join("ffmpeg2pass"),
        });
        let mut second = EncodeInvocation::new("job", "/in.mp4", dir.path().join("out.mp4"));
        second.pass = Some(PassSpec {
            number: 2,
            log_path: dir.path().join("ffmpeg2pass"),
        });

        assert!(converter.encode(first, &CancelFlag::new()).await.is_ok());
        assert!(dir.path().join("ffmpeg2pass-0.log").exists());

        let err = converter.encode(second, &CancelFlag::new()).await.unwrap_err();
        assert_eq!(err.diagnostic(), "rate control error");
    }

    #[tokio::test]
    async fn test_cancel_during_encode() {
        let converter = MockConverter::new();
        converter.set_encode_duration(Duration::from_secs(5)).await;
        let cancel = CancelFlag::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let invocation = EncodeInvocation::new("job", "/in.mp4", "/out.mp4");
        let result = converter.encode(invocation, &cancel).await;
        assert!(matches!(result, Err(ConverterError::Cancelled)));
    }

    #[tokio::test]
    async fn test_progress_updates_carry_pass() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        let (tx, mut rx) = mpsc::channel(16);

        let mut invocation = EncodeInvocation::new("job", "/in.mp4", dir.path().join("o.mp4"));
        invocation.pass = Some(PassSpec {
            number: 2,
            log_path: dir.path().join("log"),
        });
        converter
            .encode_with_progress(invocation, &CancelFlag::new(), tx)
            .await
            .unwrap();

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        assert_eq!(updates.len(), 4);
        assert!(updates.iter().all(|u| u.pass == Some(2)));
        assert_eq!(updates.last().unwrap().percent, 100.0);
    }
}
