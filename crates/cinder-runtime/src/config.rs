//! Engine configuration file

use cinder_core::{CinderError, Result};
use cinder_render::RendererConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// `[clock]` table of the engine config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Clamp on a single wall-clock frame step, in seconds
    pub max_delta: f64,
    /// Deterministic step per frame; wall clock is ignored when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_delta: Option<f64>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            max_delta: 0.25,
            fixed_delta: None,
        }
    }
}

/// Top-level engine config; missing tables fall back to defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub renderer: RendererConfig,
    pub clock: ClockConfig,
}

impl EngineConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.renderer.validate()?;
        if self.clock.max_delta <= 0.0 {
            return Err(CinderError::Config(format!(
                "clock.max_delta must be positive, got {}",
                self.clock.max_delta
            )));
        }
        if let Some(fixed) = self.clock.fixed_delta {
            if fixed < 0.0 {
                return Err(CinderError::Config(format!(
                    "clock.fixed_delta must not be negative, got {}",
                    fixed
                )));
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = EngineConfig::from_toml_str(
            r#"
[renderer]
editor_pass = true

[clock]
fixed_delta = 0.02
"#,
        )
        .unwrap();

        assert!(config.renderer.editor_pass);
        assert!(!config.renderer.wireframe);
        assert_eq!(config.renderer.line_capacity, 1024);
        assert_eq!(config.clock.fixed_delta, Some(0.02));
        assert_eq!(config.clock.max_delta, 0.25);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[clock]\nmax_delta = 0.0\n").unwrap_err();
        assert!(matches!(err, CinderError::Config(_)));

        let err = EngineConfig::from_toml_str("[renderer]\nwireframe = 3\n").unwrap_err();
        assert!(matches!(err, CinderError::TomlParseError(_)));
    }

    #[test]
    fn test_huge_line_capacity_rejected_at_load() {
        let err = EngineConfig::from_toml_str("[renderer]\nline_capacity = 4000000000000000000\n")
            .unwrap_err();
        assert!(matches!(err, CinderError::Config(_)));
        assert!(err.to_string().contains("line_capacity"));

        let config = EngineConfig::from_toml_str("[renderer]\nline_capacity = 4096\n").unwrap();
        assert_eq!(config.renderer.line_capacity, 4096);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = EngineConfig::default();
        config.renderer.wireframe = true;
        config.clock.fixed_delta = Some(0.25);

        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
