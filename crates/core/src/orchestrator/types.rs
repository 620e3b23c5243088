//! Types for the conversion orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::converter::ConverterError;
use crate::planner::{BitratePlanError, TwoPassError};

/// Errors that end a single file's conversion.
///
/// The display text is the message reported in [`ConversionResult::message`].
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Input file does not exist.
    #[error("Input file does not exist: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// Input extension is not in the supported list. `ext` includes the dot.
    #[error("Unsupported input format: {ext}")]
    UnsupportedInput { ext: String },

    /// Output directory could not be created.
    #[error("Error: Could not create output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The size target cannot be met.
    #[error(transparent)]
    Plan(#[from] BitratePlanError),

    /// A two-pass encode failed.
    #[error(transparent)]
    TwoPass(TwoPassError),

    /// A single-pass encode failed.
    #[error("FFmpeg error: {}", .0.diagnostic())]
    Backend(ConverterError),

    /// The encode was cancelled.
    #[error("Encoding cancelled")]
    Cancelled,
}

impl From<ConverterError> for ConversionError {
    fn from(err: ConverterError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Backend(err)
        }
    }
}

impl From<TwoPassError> for ConversionError {
    fn from(err: TwoPassError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::TwoPass(err)
        }
    }
}

/// Terminal outcome of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Succeeded,
    Failed,
    Cancelled,
}

impl ConversionStatus {
    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of converting one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    /// Output file; only set on success.
    pub output_path: Option<PathBuf>,
    /// `true` exactly when `status` is `Succeeded`.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    pub status: ConversionStatus,
}

impl ConversionResult {
    pub fn succeeded(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: Some(output_path.into()),
            success: true,
            message: message.into(),
            status: ConversionStatus::Succeeded,
        }
    }

    pub fn failed(input_path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            success: false,
            message: message.into(),
            status: ConversionStatus::Failed,
        }
    }

    pub fn cancelled(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            success: false,
            message: ConversionError::Cancelled.to_string(),
            status: ConversionStatus::Cancelled,
        }
    }

    /// Builds the result for a conversion error.
    pub fn from_error(input_path: impl Into<PathBuf>, err: &ConversionError) -> Self {
        match err {
            ConversionError::Cancelled => Self::cancelled(input_path),
            other => Self::failed(input_path, other.to_string()),
        }
    }
}

/// Per-file lifecycle inside a batch.
///
/// `Pending -> ResolvingOutputPath -> Encoding -> Succeeded | Failed | Cancelled`.
/// Any non-terminal state may also end directly in `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Pending,
    ResolvingOutputPath,
    Encoding,
    Succeeded,
    Failed,
    Cancelled,
}

impl FileState {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: FileState) -> bool {
        use FileState::*;
        match (self, next) {
            (Pending, ResolvingOutputPath) => true,
            (ResolvingOutputPath, Encoding) => true,
            (Encoding, Succeeded) => true,
            (from, Failed | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Moves to `next` if the transition is legal; returns whether it moved.
    pub fn advance(&mut self, next: FileState) -> bool {
        if self.can_transition_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl From<ConversionStatus> for FileState {
    fn from(status: ConversionStatus) -> Self {
        match status {
            ConversionStatus::Succeeded => Self::Succeeded,
            ConversionStatus::Failed => Self::Failed,
            ConversionStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Settings for converting a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Quality preset name; unknown names mean `medium`.
    pub quality: String,
    /// Target output size in MiB; switches to two-pass encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size_mb: Option<f64>,
    /// Output container; defaults to the output path's extension, then `mp4`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl ConvertOptions {
    pub fn new(quality: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            target_size_mb: None,
            output_format: None,
        }
    }

    pub fn with_target_size(mut self, target_size_mb: f64) -> Self {
        self.target_size_mb = Some(target_size_mb);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }
}

/// A batch of inputs converted with the same settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub quality: String,
    /// Output container for every file.
    pub output_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size_mb: Option<f64>,
    /// Template name from the library, or a raw template string.
    pub filename_template: String,
}

impl BatchRequest {
    /// A request with `medium` quality, `mp4` output and the `simple` template.
    pub fn new(inputs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output_dir: output_dir.into(),
            quality: super::presets::DEFAULT_QUALITY.to_string(),
            output_format: "mp4".to_string(),
            target_size_mb: None,
            filename_template: crate::template::DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }

    /// The per-file options this request implies.
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            quality: self.quality.clone(),
            target_size_mb: self.target_size_mb,
            output_format: Some(self.output_format.clone()),
        }
    }
}

/// Lifecycle and progress notifications from a running batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        total: usize,
    },
    FileStarted {
        index: usize,
        input: PathBuf,
        output: PathBuf,
    },
    FileProgress {
        index: usize,
        /// Overall progress of this file, 0-100.
        percent: f32,
    },
    FileFinished {
        index: usize,
        result: ConversionResult,
    },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Counts of batch outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    /// Tallies a list of results.
    pub fn from_results(results: &[ConversionResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            match result.status {
                ConversionStatus::Succeeded => summary.succeeded += 1,
                ConversionStatus::Failed => summary.failed += 1,
                ConversionStatus::Cancelled => summary.cancelled += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    /// Whether every file succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}
