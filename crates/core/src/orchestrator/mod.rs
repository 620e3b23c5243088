//! Conversion orchestrator for single files and batches.
//!
//! The orchestrator turns a request into backend invocations:
//! - **Planning**: quality preset, output container, frame rate and scale filters
//! - **Naming**: filename templates and collision-free output paths (batches)
//! - **Encoding**: one CRF invocation, or two passes when a size target is set
//!
//! Batches run files strictly one at a time. [`BatchWorker`] moves a batch onto
//! a background task with an event stream and a cancel handle.

mod config;
mod output_path;
mod presets;
mod runner;
mod types;
mod worker;

pub use config::OrchestratorConfig;
pub use output_path::OutputPathAllocator;
pub use presets::{QualityPreset, DEFAULT_QUALITY, QUALITY_PRESETS};
pub use runner::{
    is_supported_input, scale_filter, select_frame_rate, ConversionOrchestrator,
    SUPPORTED_INPUT_EXTENSIONS,
};
pub use types::{
    BatchEvent, BatchRequest, BatchSummary, ConversionError, ConversionResult, ConversionStatus,
    ConvertOptions, FileState,
};
pub use worker::{BatchHandle, BatchWorker};
