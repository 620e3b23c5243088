pub mod cancel;
pub mod config;
pub mod converter;
pub mod metadata;
pub mod metrics;
pub mod orchestrator;
pub mod planner;
pub mod scan;
pub mod template;
pub mod testing;

pub use cancel::CancelFlag;
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config,
    ConfigError, DefaultsConfig,
};
pub use converter::{
    Converter, ConverterConfig, ConverterError, EncodeInvocation, EncodeProgress,
    FfmpegConverter, MediaInfo, OutputContainer,
};
pub use metadata::{FileInfo, MetadataProvider, VideoInfo};
pub use orchestrator::{
    BatchEvent, BatchHandle, BatchRequest, BatchSummary, BatchWorker, ConversionError,
    ConversionOrchestrator, ConversionResult, ConversionStatus, ConvertOptions,
    OrchestratorConfig, QualityPreset, QUALITY_PRESETS,
};
pub use planner::{plan_two_pass, BitratePlan, BitratePlanError, TwoPassEncoder, TwoPassError};
pub use scan::{expand_inputs, scan_directory};
pub use template::{
    placeholders, safe_filename, validate_template, Placeholder, TemplateEngine, TemplateError,
    TemplateLibrary,
};
