//! Conversion orchestrator implementation.
//!
//! Converts files one at a time:
//! - Validation: input exists and has a supported extension
//! - Planning: preset, container, frame rate, scale, CRF or two-pass
//! - Encoding: one backend call (CRF) or two (size target)
//!
//! Failures never escape as errors; every input yields a [`ConversionResult`].

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancelFlag;
use crate::converter::{
    AudioSettings, Converter, EncodeInvocation, EncodeProgress, OutputContainer, RateControl,
};
use crate::metadata::{MetadataProvider, VideoInfo};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::planner::{plan_two_pass, TwoPassEncoder, TwoPassJob};
use crate::template::{validate_template, TemplateEngine, TemplateLibrary};

use super::config::OrchestratorConfig;
use super::output_path::OutputPathAllocator;
use super::presets::QualityPreset;
use super::types::{
    BatchEvent, BatchRequest, BatchSummary, ConversionError, ConversionResult, ConversionStatus,
    ConvertOptions, FileState,
};

/// Input extensions accepted for conversion (lowercase, no dot).
pub const SUPPORTED_INPUT_EXTENSIONS: [&str; 14] = [
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "3gp", "3g2", "mxf",
    "ts",
];

/// Container used when neither the options nor the output path name one.
const DEFAULT_FORMAT: &str = "mp4";

/// Frame rate used when the source rate is unknown or below the usable range.
const DEFAULT_FPS: f64 = 30.0;
const MIN_KEPT_FPS: f64 = 20.0;
const MAX_FPS: f64 = 60.0;

/// Even-dimension scale used when the preset has no fixed resolution.
const EVEN_SCALE: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

const PROGRESS_BUFFER: usize = 64;

/// Callback receiving a file's overall progress percentage.
type ProgressFn<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Whether the file extension is in [`SUPPORTED_INPUT_EXTENSIONS`] (case-insensitive).
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_INPUT_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Output frame rate for a source rate.
///
/// Sources between 20 and 60 fps keep their rate, faster ones are capped at
/// 60 and anything slower or unknown becomes 30.
pub fn select_frame_rate(source_fps: Option<f64>) -> f64 {
    match source_fps {
        Some(fps) if (MIN_KEPT_FPS..=MAX_FPS).contains(&fps) => fps,
        Some(fps) if fps > MAX_FPS => MAX_FPS,
        _ => DEFAULT_FPS,
    }
}

/// Scale filter for a preset.
pub fn scale_filter(preset: &QualityPreset) -> String {
    match preset.resolution {
        Some(res) => format!("scale={}:{}", res.width, res.height),
        None => EVEN_SCALE.to_string(),
    }
}

/// Output container name: explicit format, else the output extension, else mp4.
fn resolve_format(explicit: Option<&str>, output_path: &Path) -> String {
    let explicit = explicit
        .map(|f| f.trim().trim_start_matches('.'))
        .filter(|f| !f.is_empty());
    match explicit {
        Some(format) => format.to_ascii_lowercase(),
        None => output_path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
    }
}

/// Checks existence and extension of an input.
fn check_input(input: &Path) -> Result<(), ConversionError> {
    if !input.exists() {
        return Err(ConversionError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    if !is_supported_input(input) {
        let ext = input
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(ConversionError::UnsupportedInput { ext });
    }

    Ok(())
}

/// Maps a per-invocation update onto the file's overall progress.
///
/// The first pass of a two-pass encode covers 0-50%, the second 50-100%.
fn overall_percent(update: &EncodeProgress) -> f32 {
    let percent = update.percent.clamp(0.0, 100.0);
    match update.pass {
        Some(1) => percent / 2.0,
        Some(2) => 50.0 + percent / 2.0,
        _ => percent,
    }
}

/// Runs `run` with a progress channel whose updates are forwarded to `progress`.
async fn forward_progress<F, Fut, T>(progress: Option<ProgressFn<'_>>, run: F) -> T
where
    F: FnOnce(Option<mpsc::Sender<EncodeProgress>>) -> Fut,
    Fut: Future<Output = T>,
{
    let Some(progress) = progress else {
        return run(None).await;
    };

    let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);
    let drain = async move {
        while let Some(update) = rx.recv().await {
            progress(overall_percent(&update));
        }
    };

    // The sender lives inside `run`, so the drain ends when the encode does.
    let (result, ()) = tokio::join!(run(Some(tx)), drain);
    result
}

/// Counts a finished file in the metrics.
fn observe(result: &ConversionResult) {
    CONVERSIONS_TOTAL
        .with_label_values(&[result.status.as_str()])
        .inc();
}

async fn emit(events: Option<&mpsc::Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver must not stop the batch
        let _ = tx.send(event).await;
    }
}

/// The conversion orchestrator.
pub struct ConversionOrchestrator<C: Converter> {
    converter: Arc<C>,
    config: OrchestratorConfig,
    metadata: MetadataProvider<C>,
    two_pass: TwoPassEncoder<C>,
    templates: TemplateEngine,
    library: TemplateLibrary,
}

impl<C: Converter + 'static> ConversionOrchestrator<C> {
    /// Create a new orchestrator with built-in templates and a fresh counter.
    pub fn new(converter: Arc<C>, config: OrchestratorConfig) -> Self {
        Self {
            metadata: MetadataProvider::new(Arc::clone(&converter)),
            two_pass: TwoPassEncoder::new(Arc::clone(&converter), config.scratch_dir.clone()),
            converter,
            config,
            templates: TemplateEngine::new(),
            library: TemplateLibrary::new(),
        }
    }

    /// Use a template library with custom templates.
    pub fn with_library(mut self, library: TemplateLibrary) -> Self {
        self.library = library;
        self
    }

    /// Use a specific template engine (and therefore counter).
    pub fn with_template_engine(mut self, engine: TemplateEngine) -> Self {
        self.templates = engine;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn template_engine(&self) -> &TemplateEngine {
        &self.templates
    }

    /// Converts one file to an explicit output path.
    pub async fn convert_one(
        &self,
        input: &Path,
        output_path: &Path,
        options: &ConvertOptions,
        cancel: &CancelFlag,
    ) -> ConversionResult {
        self.convert_one_inner(input, output_path, options, cancel, None)
            .await
    }

    /// Converts one file, sending overall progress percentages to `progress_tx`.
    ///
    /// Progress is sent without blocking; updates are dropped when the channel is full.
    pub async fn convert_one_with_progress(
        &self,
        input: &Path,
        output_path: &Path,
        options: &ConvertOptions,
        cancel: &CancelFlag,
        progress_tx: mpsc::Sender<f32>,
    ) -> ConversionResult {
        let sink = move |percent: f32| {
            let _ = progress_tx.try_send(percent);
        };
        self.convert_one_inner(
            input,
            output_path,
            options,
            cancel,
            Some(&sink as ProgressFn<'_>),
        )
        .await
    }

    /// Converts one file into `output_dir`, naming it with a filename template.
    ///
    /// `filename_template` is a library name or a raw template.
    pub async fn convert_file(
        &self,
        input: &Path,
        output_dir: &Path,
        options: &ConvertOptions,
        filename_template: &str,
        cancel: &CancelFlag,
    ) -> ConversionResult {
        if let Err(e) = check_input(input) {
            let result = ConversionResult::from_error(input, &e);
            observe(&result);
            return result;
        }

        let video = self.metadata.video_info(input).await;
        let template = self.library.resolve_reference(filename_template);
        let name = self
            .templates
            .resolve(&template, input, video.as_ref(), &options.quality);
        let format = resolve_format(options.output_format.as_deref(), Path::new(""));
        let output = OutputPathAllocator::new().allocate(output_dir, &name, &format);

        let job_id = Uuid::new_v4().to_string();
        self.convert_probed(input, &output, options, video.as_ref(), &job_id, cancel, None)
            .await
    }

    /// Converts every input in order, one at a time.
    ///
    /// Returns one result per input, in input order.
    pub async fn batch_convert(
        &self,
        request: &BatchRequest,
        cancel: &CancelFlag,
    ) -> Vec<ConversionResult> {
        self.run_batch(request, cancel, None).await
    }

    /// Like [`batch_convert`](Self::batch_convert), reporting lifecycle and progress events.
    pub async fn batch_convert_with_events(
        &self,
        request: &BatchRequest,
        cancel: &CancelFlag,
        events: mpsc::Sender<BatchEvent>,
    ) -> Vec<ConversionResult> {
        self.run_batch(request, cancel, Some(&events)).await
    }

    async fn run_batch(
        &self,
        request: &BatchRequest,
        cancel: &CancelFlag,
        events: Option<&mpsc::Sender<BatchEvent>>,
    ) -> Vec<ConversionResult> {
        let batch_id = Uuid::new_v4().to_string();
        let total = request.inputs.len();
        let options = request.options();
        let format = resolve_format(Some(&request.output_format), Path::new(""));
        let template = self.library.resolve_reference(&request.filename_template);

        if !validate_template(&template) {
            warn!(
                batch_id = %batch_id,
                template = %template,
                "Filename template is not valid, names may fall back to the file stem"
            );
        }

        info!(
            batch_id = %batch_id,
            total,
            quality = %request.quality,
            format = %format,
            target_size_mb = ?request.target_size_mb,
            "Starting batch conversion"
        );
        emit(events, BatchEvent::BatchStarted { total }).await;

        let mut allocator = OutputPathAllocator::new();
        let mut results = Vec::with_capacity(total);

        for (index, input) in request.inputs.iter().enumerate() {
            let mut state = FileState::Pending;

            let result = if cancel.is_cancelled() {
                ConversionResult::cancelled(input)
            } else if !input.exists() {
                ConversionResult::from_error(
                    input,
                    &ConversionError::InputNotFound {
                        path: input.clone(),
                    },
                )
            } else {
                state.advance(FileState::ResolvingOutputPath);

                let video = if is_supported_input(input) {
                    self.metadata.video_info(input).await
                } else {
                    None
                };
                let name =
                    self.templates
                        .resolve(&template, input, video.as_ref(), &request.quality);
                let output = allocator.allocate(&request.output_dir, &name, &format);

                emit(
                    events,
                    BatchEvent::FileStarted {
                        index,
                        input: input.clone(),
                        output: output.clone(),
                    },
                )
                .await;
                state.advance(FileState::Encoding);

                let job_id = format!("{}-{}", batch_id, index);
                let sink = move |percent: f32| {
                    if let Some(tx) = events {
                        let _ = tx.try_send(BatchEvent::FileProgress { index, percent });
                    }
                };
                let progress: Option<ProgressFn<'_>> = events.map(|_| &sink as ProgressFn<'_>);

                self.convert_probed(
                    input,
                    &output,
                    &options,
                    video.as_ref(),
                    &job_id,
                    cancel,
                    progress,
                )
                .await
            };

            if matches!(state, FileState::Pending) {
                observe(&result);
            }
            state.advance(result.status.into());
            debug!(batch_id = %batch_id, index, ?state, "File finished");

            emit(
                events,
                BatchEvent::FileFinished {
                    index,
                    result: result.clone(),
                },
            )
            .await;
            results.push(result);
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            batch_id = %batch_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Batch conversion finished"
        );
        emit(
            events,
            BatchEvent::BatchFinished {
                succeeded: summary.succeeded,
                failed: summary.failed,
                cancelled: summary.cancelled,
            },
        )
        .await;

        results
    }

    async fn convert_one_inner(
        &self,
        input: &Path,
        output_path: &Path,
        options: &ConvertOptions,
        cancel: &CancelFlag,
        progress: Option<ProgressFn<'_>>,
    ) -> ConversionResult {
        if let Err(e) = check_input(input) {
            let result = ConversionResult::from_error(input, &e);
            observe(&result);
            return result;
        }

        let video = self.metadata.video_info(input).await;
        let job_id = Uuid::new_v4().to_string();
        self.convert_probed(
            input,
            output_path,
            options,
            video.as_ref(),
            &job_id,
            cancel,
            progress,
        )
        .await
    }

    /// Converts a file whose video info has already been looked up.
    #[allow(clippy::too_many_arguments)]
    async fn convert_probed(
        &self,
        input: &Path,
        output_path: &Path,
        options: &ConvertOptions,
        video: Option<&VideoInfo>,
        job_id: &str,
        cancel: &CancelFlag,
        progress: Option<ProgressFn<'_>>,
    ) -> ConversionResult {
        let start = Instant::now();
        let mode = if options.target_size_mb.is_some() {
            "two_pass"
        } else {
            "crf"
        };

        let result = match self
            .try_convert(input, output_path, options, video, job_id, cancel, progress)
            .await
        {
            Ok(message) => ConversionResult::succeeded(input, output_path, message),
            Err(e) => ConversionResult::from_error(input, &e),
        };

        observe(&result);
        CONVERSION_DURATION
            .with_label_values(&[mode])
            .observe(start.elapsed().as_secs_f64());

        match result.status {
            ConversionStatus::Succeeded => info!(
                job_id,
                input = %input.display(),
                output = %output_path.display(),
                mode,
                "Conversion succeeded"
            ),
            ConversionStatus::Failed => warn!(
                job_id,
                input = %input.display(),
                error = %result.message,
                "Conversion failed"
            ),
            ConversionStatus::Cancelled => info!(
                job_id,
                input = %input.display(),
                "Conversion cancelled"
            ),
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_convert(
        &self,
        input: &Path,
        output_path: &Path,
        options: &ConvertOptions,
        video: Option<&VideoInfo>,
        job_id: &str,
        cancel: &CancelFlag,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<String, ConversionError> {
        check_input(input)?;

        if QualityPreset::lookup(&options.quality).is_none() {
            warn!(quality = %options.quality, "Unknown quality preset, using medium");
        }
        let preset = QualityPreset::by_name(&options.quality);
        let format = resolve_format(options.output_format.as_deref(), output_path);
        let container = OutputContainer::from_extension(&format);

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    ConversionError::OutputDirectory {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let fps = select_frame_rate(video.map(|v| v.fps));
        let filters = vec![format!("fps={}", fps), scale_filter(preset)];
        let duration_secs = video.map(|v| v.duration_secs).filter(|d| *d > 0.0);

        debug!(
            job_id,
            preset = preset.name,
            container = %container,
            fps,
            "Planning conversion"
        );

        match options.target_size_mb {
            Some(target_size_mb) => {
                let plan = plan_two_pass(
                    duration_secs.unwrap_or(0.0),
                    target_size_mb,
                    self.config.audio_bitrate_kbps,
                )?;

                let job = TwoPassJob {
                    job_id: job_id.to_string(),
                    input_path: input.to_path_buf(),
                    output_path: output_path.to_path_buf(),
                    codecs: container.codecs(),
                    filters,
                    plan,
                    duration_secs,
                };

                forward_progress(progress, |tx| self.two_pass.encode(&job, cancel, tx)).await?;

                Ok(format!(
                    "Successfully converted video to {} with target size {}MB",
                    output_path.display(),
                    target_size_mb
                ))
            }
            None => {
                let invocation = self.crf_invocation(
                    job_id,
                    input,
                    output_path,
                    preset,
                    &container,
                    filters,
                    duration_secs,
                );

                let converter = &self.converter;
                forward_progress(progress, |tx| async move {
                    match tx {
                        Some(tx) => converter.encode_with_progress(invocation, cancel, tx).await,
                        None => converter.encode(invocation, cancel).await,
                    }
                })
                .await?;

                Ok(format!(
                    "Successfully converted video to {}",
                    output_path.display()
                ))
            }
        }
    }

    /// Single-pass quality-targeted invocation.
    ///
    /// Containers without a known codec pair only get the speed preset.
    #[allow(clippy::too_many_arguments)]
    fn crf_invocation(
        &self,
        job_id: &str,
        input: &Path,
        output_path: &Path,
        preset: &QualityPreset,
        container: &OutputContainer,
        filters: Vec<String>,
        duration_secs: Option<f64>,
    ) -> EncodeInvocation {
        let mut invocation = EncodeInvocation::new(job_id, input, output_path);
        invocation.speed = Some(preset.speed);
        invocation.duration_secs = duration_secs;

        if let Some((video_codec, audio_codec)) = container.codecs() {
            invocation.video_codec = Some(video_codec);
            invocation.audio = Some(AudioSettings {
                codec: audio_codec,
                bitrate_kbps: self.config.audio_bitrate_kbps,
            });
            invocation.rate_control = Some(RateControl::Crf(preset.crf));
            invocation.filters = filters;
        }

        invocation
    }
}
