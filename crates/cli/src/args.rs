//! Command line arguments.

use clap::{value_parser, Parser};
use std::path::PathBuf;

use vidbatch_core::{BatchRequest, DefaultsConfig, QualityPreset};

/// Convert videos with ffmpeg using quality presets, naming templates and
/// optional target file sizes.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video files or directories to convert
    #[arg(
        value_parser = value_parser!(PathBuf),
        required_unless_present_any = ["list_templates", "list_placeholders"]
    )]
    pub inputs: Vec<PathBuf>,

    /// Configuration file (defaults to ./vidbatch.toml when present)
    #[arg(short, long, value_parser = value_parser!(PathBuf))]
    pub config: Option<PathBuf>,

    /// Directory for converted files
    #[arg(short, long, value_parser = value_parser!(PathBuf))]
    pub output_dir: Option<PathBuf>,

    /// Quality preset (very_low, low, medium, high, very_high, 144p ... 2160p)
    #[arg(short, long, value_parser = Args::parse_quality)]
    pub quality: Option<String>,

    /// Output container (mp4, mkv, webm, mov, or any ffmpeg muxer extension)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Filename template name or raw template, e.g. "{filename}_{quality}"
    #[arg(short, long)]
    pub template: Option<String>,

    /// Target output size in MB; enables two-pass encoding
    #[arg(long, value_parser = Args::parse_target_size)]
    pub target_size: Option<f64>,

    /// Scan input directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Emit events and listings as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// List available filename templates and exit
    #[arg(long)]
    pub list_templates: bool,

    /// List template placeholders and exit
    #[arg(long)]
    pub list_placeholders: bool,
}

impl Args {
    fn parse_quality(s: &str) -> Result<String, String> {
        match QualityPreset::lookup(s) {
            Some(preset) => Ok(preset.name.to_string()),
            None => Err(format!(
                "unknown quality '{}', expected one of: {}",
                s,
                QualityPreset::names().collect::<Vec<_>>().join(", ")
            )),
        }
    }

    fn parse_target_size(s: &str) -> Result<f64, String> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid target size '{}'", s))?;
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err("target size must be greater than 0".to_string())
        }
    }

    /// Whether recursion is requested here or in the config defaults.
    pub fn recursive(&self, defaults: &DefaultsConfig) -> bool {
        self.recursive || defaults.recursive_scan
    }

    /// Builds the batch request, command line values taking precedence over config.
    pub fn batch_request(&self, defaults: &DefaultsConfig, inputs: Vec<PathBuf>) -> BatchRequest {
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| defaults.output_dir.clone());

        let mut request = BatchRequest::new(inputs, output_dir);
        request.quality = self
            .quality
            .clone()
            .unwrap_or_else(|| defaults.quality.clone());
        request.output_format = self
            .format
            .as_deref()
            .unwrap_or(&defaults.format)
            .trim_start_matches('.')
            .to_ascii_lowercase();
        request.filename_template = self
            .template
            .clone()
            .unwrap_or_else(|| defaults.template.clone());
        request.target_size_mb = self.target_size.or(defaults.target_size_mb);
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "vidbatch",
            "-q",
            "720p",
            "--format",
            ".WEBM",
            "-t",
            "with_quality",
            "--target-size",
            "25",
            "-o",
            "/out",
            "a.mp4",
            "clips",
        ])
        .unwrap();

        assert_eq!(args.inputs, vec![PathBuf::from("a.mp4"), PathBuf::from("clips")]);
        let request = args.batch_request(&DefaultsConfig::default(), args.inputs.clone());
        assert_eq!(request.quality, "720p");
        assert_eq!(request.output_format, "webm");
        assert_eq!(request.filename_template, "with_quality");
        assert_eq!(request.target_size_mb, Some(25.0));
        assert_eq!(request.output_dir, PathBuf::from("/out"));
    }

    #[test]
    fn test_config_defaults_fill_gaps() {
        let args = Args::try_parse_from(["vidbatch", "a.mp4"]).unwrap();
        let defaults = DefaultsConfig {
            quality: "high".to_string(),
            format: "mkv".to_string(),
            template: "{filename}_{counter}".to_string(),
            output_dir: PathBuf::from("done"),
            recursive_scan: true,
            target_size_mb: Some(8.0),
        };

        let request = args.batch_request(&defaults, args.inputs.clone());
        assert_eq!(request.quality, "high");
        assert_eq!(request.output_format, "mkv");
        assert_eq!(request.filename_template, "{filename}_{counter}");
        assert_eq!(request.output_dir, PathBuf::from("done"));
        assert_eq!(request.target_size_mb, Some(8.0));
        assert!(args.recursive(&defaults));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Args::try_parse_from(["vidbatch", "-q", "ultra", "a.mp4"]).is_err());
        assert!(Args::try_parse_from(["vidbatch", "--target-size", "0", "a.mp4"]).is_err());
        assert!(Args::try_parse_from(["vidbatch", "--target-size", "big", "a.mp4"]).is_err());
    }

    #[test]
    fn test_inputs_required_unless_listing() {
        assert!(Args::try_parse_from(["vidbatch"]).is_err());
        assert!(Args::try_parse_from(["vidbatch", "--list-templates"]).is_ok());
        assert!(Args::try_parse_from(["vidbatch", "--list-placeholders"]).is_ok());
    }
}
