//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::ConverterConfig;
use crate::planner::DEFAULT_AUDIO_BITRATE_KBPS;

/// Settings the orchestrator needs beyond the converter itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Root under which per-job pass-log directories are created.
    pub scratch_dir: PathBuf,

    /// Audio bitrate for encoded audio and for two-pass budgets, in kbps.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,

    /// Capacity of the batch event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_audio_bitrate() -> u32 {
    DEFAULT_AUDIO_BITRATE_KBPS
}

fn default_event_buffer() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_converter_config(&ConverterConfig::default())
    }
}

impl OrchestratorConfig {
    /// Derives orchestrator settings from the converter section.
    pub fn from_converter_config(config: &ConverterConfig) -> Self {
        Self {
            scratch_dir: config.temp_dir.clone(),
            audio_bitrate_kbps: config.audio_bitrate_kbps,
            event_buffer: default_event_buffer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_converter_config() {
        let converter = ConverterConfig::default().with_temp_dir(PathBuf::from("/scratch"));
        let config = OrchestratorConfig::from_converter_config(&converter);
        assert_eq!(config.scratch_dir, PathBuf::from("/scratch"));
        assert_eq!(config.audio_bitrate_kbps, 128);
        assert_eq!(config.event_buffer, 256);
    }
}
