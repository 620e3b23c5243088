//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{
    EncodeInvocation, EncodeOutput, EncodeProgress, MediaInfo, RateControl, VideoCodec,
    VideoStreamInfo,
};
use crate::cancel::CancelFlag;

/// How often the cancel flag and timeout are checked while ffmpeg runs.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum spacing between progress messages.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Number of trailing stderr lines kept as the failure diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Builds the ffmpeg argument list for one invocation.
    fn build_args(&self, invocation: &EncodeInvocation) -> Vec<String> {
        let mut args = vec![
            if invocation.overwrite { "-y" } else { "-n" }.to_string(),
            "-i".to_string(),
            invocation.input_path.to_string_lossy().to_string(),
        ];

        if !invocation.filters.is_empty() {
            args.extend(["-vf".to_string(), invocation.filters.join(",")]);
        }

        if let Some(codec) = invocation.video_codec {
            args.extend(["-c:v".to_string(), codec.ffmpeg_codec().to_string()]);
        }

        match invocation.rate_control {
            Some(RateControl::Crf(crf)) => {
                args.extend(["-crf".to_string(), crf.to_string()]);
                // libvpx-vp9 only runs in constant quality mode with a zero bitrate
                if invocation.video_codec == Some(VideoCodec::Vp9) {
                    args.extend(["-b:v".to_string(), "0".to_string()]);
                }
            }
            Some(RateControl::Bitrate { bps }) => {
                args.extend(["-b:v".to_string(), bps.to_string()]);
            }
            None => {}
        }

        if let Some(speed) = invocation.speed {
            args.extend(["-preset".to_string(), speed.as_str().to_string()]);
        }

        if let Some(ref pass) = invocation.pass {
            args.extend([
                "-pass".to_string(),
                pass.number.to_string(),
                "-passlogfile".to_string(),
                pass.log_path.to_string_lossy().to_string(),
            ]);
        }

        if invocation.disable_audio {
            args.push("-an".to_string());
        } else if let Some(audio) = invocation.audio {
            args.extend([
                "-c:a".to_string(),
                audio.codec.ffmpeg_codec().to_string(),
                "-b:a".to_string(),
                format!("{}k", audio.bitrate_kbps),
            ]);
        }

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        if let Some(ref format) = invocation.output_format {
            args.extend(["-f".to_string(), format.clone()]);
        }

        args.push(invocation.output_path.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    ///
    /// Missing numeric fields default to zero; present but unparsable ones are an error.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: Option<String>,
            duration: Option<String>,
            size: Option<String>,
            bit_rate: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            codec_name: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            avg_frame_rate: Option<String>,
        }

        fn parse_field<T: std::str::FromStr>(
            name: &str,
            value: Option<&String>,
        ) -> Result<Option<T>, ConverterError> {
            match value {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                    ConverterError::ParseError {
                        reason: format!("invalid {} value '{}'", name, raw),
                    }
                }),
            }
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let format = probe.format.as_ref();
        let duration_secs =
            parse_field::<f64>("duration", format.and_then(|f| f.duration.as_ref()))?
                .unwrap_or(0.0);
        let size_bytes =
            parse_field::<u64>("size", format.and_then(|f| f.size.as_ref()))?.unwrap_or(0);
        let bitrate_bps =
            parse_field::<u64>("bit_rate", format.and_then(|f| f.bit_rate.as_ref()))?
                .unwrap_or(0);

        let format_name = format
            .and_then(|f| f.format_name.as_deref())
            .and_then(|name| name.split(',').next())
            .unwrap_or("unknown");

        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .map(|s| VideoStreamInfo {
                codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
                width: s.width.unwrap_or(0),
                height: s.height.unwrap_or(0),
                avg_frame_rate: s.avg_frame_rate.clone().unwrap_or_else(|| "0/1".to_string()),
            });

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            bitrate_bps,
            format: format_name.to_string(),
            video,
        })
    }

    /// Runs one ffmpeg invocation with optional progress reporting.
    async fn run_invocation(
        &self,
        invocation: &EncodeInvocation,
        cancel: &CancelFlag,
        progress_tx: Option<mpsc::Sender<EncodeProgress>>,
    ) -> Result<EncodeOutput, ConverterError> {
        let start = Instant::now();

        if cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        if !invocation.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: invocation.input_path.clone(),
            });
        }

        // Ensure output directory exists
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
        }

        let args = self.build_args(invocation);
        debug!(job_id = %invocation.job_id, ?args, "Running ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::encode_failed("ffmpeg stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let time_regex = Regex::new(r"^out_time_ms=(\d+)$").ok();
        let speed_regex = Regex::new(r"^speed=\s*(\d+\.?\d*)x$").ok();
        let progress_key_regex = Regex::new(r"^\w+=\S*$").ok();

        let deadline = self
            .config
            .timeout_secs
            .map(|secs| time::Instant::now() + Duration::from_secs(secs));
        let mut poll = time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut current_time = 0.0;
        let mut current_speed = None;
        let mut last_progress_send = Instant::now();
        let mut diagnostics: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_LINES);

        loop {
            tokio::select! {
                line = reader.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => {
                            let _ = child.kill().await;
                            return Err(ConverterError::Io(e));
                        }
                    };
                    let line = line.trim();

                    let is_progress_line = progress_key_regex
                        .as_ref()
                        .map(|re| re.is_match(line))
                        .unwrap_or(false);
                    if !is_progress_line {
                        if !line.is_empty() {
                            if diagnostics.len() == DIAGNOSTIC_LINES {
                                diagnostics.pop_front();
                            }
                            diagnostics.push_back(line.to_string());
                        }
                        continue;
                    }

                    if let Some(caps) = time_regex.as_ref().and_then(|re| re.captures(line)) {
                        if let Ok(us) = caps[1].parse::<f64>() {
                            // out_time_ms is reported in microseconds
                            current_time = us / 1_000_000.0;
                        }
                    }

                    if let Some(caps) = speed_regex.as_ref().and_then(|re| re.captures(line)) {
                        current_speed = Some(format!("{}x", &caps[1]));
                    }

                    if let Some(ref tx) = progress_tx {
                        if last_progress_send.elapsed() >= PROGRESS_INTERVAL || line == "progress=end" {
                            let percent = match invocation.duration_secs {
                                Some(dur) if dur > 0.0 => (current_time / dur * 100.0).min(100.0) as f32,
                                _ => 0.0,
                            };
                            let progress = EncodeProgress {
                                job_id: invocation.job_id.clone(),
                                pass: invocation.pass.as_ref().map(|p| p.number),
                                percent,
                                time_secs: current_time,
                                duration_secs: invocation.duration_secs,
                                speed: current_speed.clone(),
                            };
                            // Non-blocking send
                            let _ = tx.try_send(progress);
                            last_progress_send = Instant::now();
                        }
                    }
                }
                _ = poll.tick() => {
                    if cancel.is_cancelled() {
                        warn!(job_id = %invocation.job_id, "Cancellation requested, killing ffmpeg");
                        let _ = child.kill().await;
                        return Err(ConverterError::Cancelled);
                    }
                    if let (Some(deadline), Some(secs)) = (deadline, self.config.timeout_secs) {
                        if time::Instant::now() >= deadline {
                            warn!(job_id = %invocation.job_id, timeout_secs = secs, "ffmpeg timed out, killing process");
                            let _ = child.kill().await;
                            return Err(ConverterError::Timeout { timeout_secs: secs });
                        }
                    }
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let stderr: Vec<String> = diagnostics.into_iter().collect();
            return Err(ConverterError::encode_failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                if stderr.is_empty() {
                    None
                } else {
                    Some(stderr.join("\n"))
                },
            ));
        }

        if invocation.writes_output() && tokio::fs::metadata(&invocation.output_path).await.is_err() {
            return Err(ConverterError::encode_failed("Output file not created", None));
        }

        Ok(EncodeOutput {
            job_id: invocation.job_id.clone(),
            output_path: invocation.output_path.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Checks that a binary can be executed with `-version`.
    async fn check_binary(path: &Path) -> Result<(), std::io::Error> {
        Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn encode(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
    ) -> Result<EncodeOutput, ConverterError> {
        self.run_invocation(&invocation, cancel, None).await
    }

    async fn encode_with_progress(
        &self,
        invocation: EncodeInvocation,
        cancel: &CancelFlag,
        progress_tx: mpsc::Sender<EncodeProgress>,
    ) -> Result<EncodeOutput, ConverterError> {
        self.run_invocation(&invocation, cancel, Some(progress_tx))
            .await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Err(e) = Self::check_binary(&self.config.ffmpeg_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        if let Err(e) = Self::check_binary(&self.config.ffprobe_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        // Ensure temp dir exists
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;

        Ok(())
    }
}
