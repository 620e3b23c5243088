//! Target-size (two-pass) conversion integration tests.
//!
//! These tests verify the two-pass path end to end with the mock converter:
//! - Bitrate planning from probed duration
//! - Pass ordering, shared pass-log and scratch cleanup
//! - Failure in either pass, cancellation, impossible targets
//! - Progress spanning both passes

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use vidbatch_core::{
    converter::{AudioCodec, RateControl, VideoCodec},
    orchestrator::OrchestratorConfig,
    testing::{fixtures, MockConverter},
    BatchEvent, BatchRequest, CancelFlag, ConversionOrchestrator, ConversionResult,
    ConversionStatus,
    ConvertOptions,
};

struct TestHarness {
    orchestrator: ConversionOrchestrator<MockConverter>,
    converter: Arc<MockConverter>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let converter = Arc::new(MockConverter::new());
        let config = OrchestratorConfig {
            scratch_dir: temp_dir.path().join("scratch"),
            ..OrchestratorConfig::default()
        };
        let orchestrator = ConversionOrchestrator::new(Arc::clone(&converter), config);

        Self {
            orchestrator,
            converter,
            temp_dir,
        }
    }

    /// Creates an input whose probe reports `duration_secs`.
    async fn input(&self, name: &str, duration_secs: f64) -> PathBuf {
        let path = fixtures::touch_inputs(self.temp_dir.path(), &[name])
            .expect("Failed to create input")
            .remove(0);
        self.converter
            .set_probe_result(&path, fixtures::media_info(&path, duration_secs))
            .await;
        path
    }

    fn output(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("out").join(name)
    }

    fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path().join("scratch"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        options: ConvertOptions,
    ) -> ConversionResult {
        self.orchestrator
            .convert_one(input, output, &options, &CancelFlag::new())
            .await
    }
}

#[tokio::test]
async fn test_two_pass_runs_both_passes_with_shared_log() {
    let harness = TestHarness::new();
    let input = harness.input("talk.mp4", 120.0).await;
    let output = harness.output("talk.webm");

    let result = harness
        .convert(&input, &output, ConvertOptions::new("medium").with_target_size(10.0))
        .await;
    assert!(result.success, "{}", result.message);
    assert!(output.exists());

    let recorded = harness.converter.recorded_invocations().await;
    assert_eq!(recorded.len(), 2);
    let (first, second) = (&recorded[0].invocation, &recorded[1].invocation);

    let first_pass = first.pass.as_ref().unwrap();
    let second_pass = second.pass.as_ref().unwrap();
    assert_eq!(first_pass.number, 1);
    assert_eq!(second_pass.number, 2);
    assert_eq!(first_pass.log_path, second_pass.log_path);

    for invocation in [first, second] {
        assert_eq!(invocation.video_codec, Some(VideoCodec::Vp9));
        assert_eq!(
            invocation.rate_control,
            Some(RateControl::Bitrate { bps: 533_026 })
        );
        assert_eq!(
            invocation.filters,
            vec!["fps=30", "scale=trunc(iw/2)*2:trunc(ih/2)*2"]
        );
    }
    assert!(first.disable_audio);
    assert_eq!(first.output_format.as_deref(), Some("null"));
    assert_eq!(second.audio.map(|a| a.codec), Some(AudioCodec::Opus));
    assert_eq!(second.output_path, output);

    // Pass-log directory is gone once the job ends
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_first_pass_failure_skips_second_pass() {
    let harness = TestHarness::new();
    let input = harness.input("clip.mp4", 60.0).await;
    harness
        .converter
        .set_pass_failure(1, "Could not open encoder")
        .await;

    let result = harness
        .convert(&input, &harness.output("clip.mp4"), ConvertOptions::new("medium").with_target_size(5.0))
        .await;

    assert_eq!(result.status, ConversionStatus::Failed);
    assert_eq!(result.message, "First pass encoding error: Could not open encoder");
    assert_eq!(harness.converter.invocation_count().await, 1);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_second_pass_failure_message() {
    let harness = TestHarness::new();
    let input = harness.input("clip.mp4", 60.0).await;
    harness.converter.set_pass_failure(2, "Broken pipe").await;

    let result = harness
        .convert(&input, &harness.output("clip.mp4"), ConvertOptions::new("medium").with_target_size(5.0))
        .await;

    assert_eq!(result.message, "Second pass encoding error: Broken pipe");
    assert_eq!(harness.converter.invocation_count().await, 2);
    assert!(!harness.output("clip.mp4").exists());
}

#[tokio::test]
async fn test_impossible_target_never_invokes_backend() {
    let harness = TestHarness::new();
    let input = harness.input("lecture.mp4", 3600.0).await;

    let result = harness
        .convert(&input, &harness.output("lecture.mp4"), ConvertOptions::new("low").with_target_size(2.0))
        .await;

    assert_eq!(result.message, "Target size too small for this video duration");
    assert_eq!(harness.converter.invocation_count().await, 0);
}

#[tokio::test]
async fn test_cancel_during_first_pass() {
    let harness = TestHarness::new();
    let input = harness.input("clip.mp4", 60.0).await;
    harness
        .converter
        .set_encode_duration(Duration::from_secs(10))
        .await;

    let cancel = CancelFlag::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let result = harness
        .orchestrator
        .convert_one(
            &input,
            &harness.output("clip.mp4"),
            &ConvertOptions::new("medium").with_target_size(5.0),
            &cancel,
        )
        .await;

    assert_eq!(result.status, ConversionStatus::Cancelled);
    assert_eq!(result.message, "Encoding cancelled");
    assert_eq!(harness.converter.invocation_count().await, 1);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_batch_progress_spans_both_passes() {
    let harness = TestHarness::new();
    let input = harness.input("clip.mp4", 90.0).await;

    let mut request = BatchRequest::new(vec![input], harness.temp_dir.path().join("out"));
    request.target_size_mb = Some(20.0);

    let (tx, mut rx) = mpsc::channel(256);
    let results = harness
        .orchestrator
        .batch_convert_with_events(&request, &CancelFlag::new(), tx)
        .await;
    assert!(results[0].success, "{}", results[0].message);
    assert!(results[0].message.ends_with("with target size 20MB"));

    let mut progress = Vec::new();
    while let Some(event) = rx.recv().await {
        if let BatchEvent::FileProgress { percent, .. } = event {
            progress.push(percent);
        }
    }
    assert_eq!(progress.len(), 8);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress[3], 50.0);
    assert_eq!(progress.last().copied(), Some(100.0));
}
