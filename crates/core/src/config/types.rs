use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::converter::ConverterConfig;
use crate::orchestrator::{OrchestratorConfig, DEFAULT_QUALITY};
use crate::template::{TemplateError, TemplateLibrary, DEFAULT_TEMPLATE_NAME};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// User-defined filename templates by name.
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

impl Config {
    /// Orchestrator settings derived from the converter section.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::from_converter_config(&self.converter)
    }

    /// Built-in templates plus the configured custom ones.
    pub fn template_library(&self) -> Result<TemplateLibrary, TemplateError> {
        TemplateLibrary::with_custom(self.templates.iter())
    }
}

/// Defaults applied when the command line does not say otherwise.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_format")]
    pub format: String,
    /// Template name or raw template.
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Descend into subdirectories when an input is a directory.
    #[serde(default)]
    pub recursive_scan: bool,
    /// Target output size in MiB; enables two-pass encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size_mb: Option<f64>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            format: default_format(),
            template: default_template(),
            output_dir: default_output_dir(),
            recursive_scan: false,
            target_size_mb: None,
        }
    }
}

fn default_quality() -> String {
    DEFAULT_QUALITY.to_string()
}

fn default_format() -> String {
    "mp4".to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE_NAME.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("converted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.defaults.quality, "medium");
        assert_eq!(config.defaults.format, "mp4");
        assert_eq!(config.defaults.template, "simple");
        assert_eq!(config.defaults.output_dir, PathBuf::from("converted"));
        assert!(!config.defaults.recursive_scan);
        assert!(config.defaults.target_size_mb.is_none());
        assert_eq!(config.converter.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(config.converter.timeout_secs.is_none());
        assert!(config.templates.is_empty());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[converter]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
timeout_secs = 3600
audio_bitrate_kbps = 96

[defaults]
quality = "720p"
format = "webm"
template = "mine"
output_dir = "/videos/out"
recursive_scan = true
target_size_mb = 25

[templates]
mine = "{source}_{filename}_{counter}"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.converter.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.converter.timeout_secs, Some(3600));
        assert_eq!(config.defaults.quality, "720p");
        assert_eq!(config.defaults.target_size_mb, Some(25.0));
        assert!(config.defaults.recursive_scan);
        assert_eq!(
            config.templates.get("mine").map(String::as_str),
            Some("{source}_{filename}_{counter}")
        );

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.audio_bitrate_kbps, 96);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let toml = r#"
[defaults]
quality = "low"
colour = "blue"

[server]
port = 8080
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.quality, "low");
    }

    #[test]
    fn test_template_library_includes_custom() {
        let mut config = Config::default();
        config
            .templates
            .insert("mine".to_string(), "{filename}_{counter}".to_string());
        let library = config.template_library().unwrap();
        assert_eq!(library.lookup("mine"), Some("{filename}_{counter}"));
        assert_eq!(library.lookup("simple"), Some("{filename}"));
    }
}
