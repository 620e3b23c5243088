use super::{types::Config, ConfigError};
use crate::orchestrator::QualityPreset;
use crate::template::check_template;

/// Validate configuration
/// Currently validates:
/// - Default quality is a known preset
/// - Default format is a plain extension
/// - Converter timeout is positive when set
/// - Custom templates and the default template are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let defaults = &config.defaults;

    if QualityPreset::lookup(&defaults.quality).is_none() {
        return Err(ConfigError::ValidationError(format!(
            "defaults.quality '{}' is not a known preset",
            defaults.quality
        )));
    }

    let format = defaults.format.trim_start_matches('.');
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::ValidationError(format!(
            "defaults.format '{}' must be a non-empty alphanumeric extension",
            defaults.format
        )));
    }

    if let Some(target) = defaults.target_size_mb {
        if !(target > 0.0) || !target.is_finite() {
            return Err(ConfigError::ValidationError(
                "defaults.target_size_mb must be greater than 0".to_string(),
            ));
        }
    }

    if config.converter.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    let library = config
        .template_library()
        .map_err(|e| ConfigError::ValidationError(format!("templates: {}", e)))?;

    let template = library.resolve_reference(&defaults.template);
    check_template(&template).map_err(|e| {
        ConfigError::ValidationError(format!("defaults.template '{}': {}", defaults.template, e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_unknown_quality_fails() {
        let mut config = Config::default();
        config.defaults.quality = "ultra".to_string();
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_format() {
        let mut config = Config::default();
        config.defaults.format = ".mkv".to_string();
        assert!(validate_config(&config).is_ok());

        config.defaults.format = "m p4".to_string();
        assert!(validate_config(&config).is_err());

        config.defaults.format = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_timeout_zero_fails() {
        let mut config = Config::default();
        config.converter.timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());

        config.converter.timeout_secs = Some(30);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_target_size() {
        let mut config = Config::default();
        config.defaults.target_size_mb = Some(0.0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_templates() {
        let mut config = Config::default();
        config
            .templates
            .insert("bad".to_string(), "{filename}_{nope}".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("nope"));

        let mut config = Config::default();
        config.defaults.template = "{filename}:{quality}".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config
            .templates
            .insert("mine".to_string(), "{source}_{counter}".to_string());
        config.defaults.template = "mine".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
