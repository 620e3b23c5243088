//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{EncodeInvocation, EncodeOutput, EncodeProgress, MediaInfo};
use crate::cancel::CancelFlag;

/// A transcoding backend.
///
/// One call to [`Converter::encode`] is one blocking, long-running backend
/// invocation from the caller's point of view.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file for container and stream metadata.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Runs a single encoder invocation.
    ///
    /// Implementations poll `cancel` while the backend runs and return
    /// [`ConverterError::Cancelled`] once it is set.
    async fn encode(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
    ) -> Result<EncodeOutput, ConverterError>;

    /// Runs a single encoder invocation with progress reporting.
    ///
    /// If the receiver is dropped, encoding continues without progress reporting.
    async fn encode_with_progress(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
        progress_tx: mpsc::Sender<EncodeProgress>,
    ) -> Result<EncodeOutput, ConverterError>;

    /// Validates that the backend is installed and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct EchoConverter;

    #[async_trait]
    impl Converter for EchoConverter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
            Ok(MediaInfo {
                path: path.to_path_buf(),
                size_bytes: 1024,
                duration_secs: 60.0,
                bitrate_bps: 1_000_000,
                format: "mov".to_string(),
                video: None,
            })
        }

        async fn encode(
            &self,
            invocation: EncodeInvocation,
            cancel: &CancelFlag,
        ) -> Result<EncodeOutput, ConverterError> {
            if cancel.is_cancelled() {
                return Err(ConverterError::Cancelled);
            }
            Ok(EncodeOutput {
                job_id: invocation.job_id,
                output_path: invocation.output_path,
                duration_ms: 0,
            })
        }

        async fn encode_with_progress(
            &self,
            invocation: EncodeInvocation,
            cancel: &CancelFlag,
            _progress_tx: mpsc::Sender<EncodeProgress>,
        ) -> Result<EncodeOutput, ConverterError> {
            self.encode(invocation, cancel).await
        }

        async fn validate(&self) -> Result<(), ConverterError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_trait_object_encode() {
        let converter: Box<dyn Converter> = Box::new(EchoConverter);
        let invocation = EncodeInvocation::new("job-1", "/in.mp4", "/out/out.mp4");
        let output = converter
            .encode(invocation, &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(output.job_id, "job-1");
        assert_eq!(output.output_path, PathBuf::from("/out/out.mp4"));
    }

    #[tokio::test]
    async fn test_trait_object_respects_cancel() {
        let converter: Box<dyn Converter> = Box::new(EchoConverter);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = converter
            .encode(EncodeInvocation::new("job", "/in.mp4", "/out.mp4"), &cancel)
            .await;
        assert!(matches!(result, Err(ConverterError::Cancelled)));
    }
}
