//! Spring Presence configuration system
//!
//! This crate provides centralized configuration for presence transitions,
//! loading settings from `presence.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default config file name looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "presence.toml";

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// The file is not valid TOML for [`PresenceConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PresenceConfig {
    /// Spring physics defaults
    pub spring: SpringConfig,
    /// Timing defaults for motion-less transitions
    pub timing: TimingConfig,
    /// Presence controller defaults
    pub presence: PresenceDefaults,
    /// Motion descriptor applied by the demo
    pub variants: Option<VariantsConfig>,
    /// Headless demo settings
    pub demo: DemoConfig,
}

/// Spring physics configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpringConfig {
    /// Restoring force strength
    pub stiffness: f64,
    /// Mass of the simulated body
    pub mass: f64,
    /// Velocity drag
    pub damping: f64,
    /// Upper bound on solver output frames (about 10s at 60 Hz)
    pub max_frames: usize,
}

/// Timing configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Duration used when a transition carries no physical motion
    pub default_duration_ms: f64,
}

/// Presence controller defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresenceDefaults {
    /// Play the entering clip on the very first attachment
    pub animate_first_render: bool,
    /// Name attached to every log record of an instance
    pub debug_name: String,
}

/// A `from`/`to` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RangeConfig {
    pub from: f64,
    pub to: f64,
}

/// How a scale entry is turned into a scale factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScaleModeConfig {
    /// `1 + (from - to)`
    Additive,
    /// `from / to`
    #[default]
    Ratio,
}

/// Scale entry of a motion descriptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScaleConfig {
    #[serde(default)]
    pub mode: ScaleModeConfig,
    pub from: f64,
    pub to: f64,
}

/// Declarative motion descriptor as written in `presence.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VariantsConfig {
    pub x: Option<RangeConfig>,
    pub y: Option<RangeConfig>,
    pub scale: Option<ScaleConfig>,
    /// Rotation in degrees
    pub rotation: Option<f64>,
    pub opacity: Option<RangeConfig>,
    /// Explicit duration for transitions without physical motion
    pub duration_ms: Option<f64>,
}

/// Headless demo configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Simulated frame interval in milliseconds
    pub frame_ms: f64,
    /// Start the demo element hidden
    pub start_hidden: bool,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 150.0,
            mass: 3.0,
            damping: 27.0,
            max_frames: 600,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 1000.0,
        }
    }
}

impl Default for PresenceDefaults {
    fn default() -> Self {
        Self {
            animate_first_render: true,
            debug_name: "unknown".to_string(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frame_ms: 1000.0 / 60.0,
            start_hidden: false,
        }
    }
}

impl PresenceConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `presence.toml` in the current directory,
    /// or return the defaults if it is missing or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        self.merge_with_vars(|key| std::env::var(key).ok());
    }

    /// Merge overrides from an arbitrary variable source.
    ///
    /// Unparsable numeric values are ignored and leave the current value in place.
    pub fn merge_with_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        // Spring settings
        if let Some(v) = number("PRESENCE_STIFFNESS") {
            self.spring.stiffness = v;
        }
        if let Some(v) = number("PRESENCE_MASS") {
            self.spring.mass = v;
        }
        if let Some(v) = number("PRESENCE_DAMPING") {
            self.spring.damping = v;
        }
        if let Some(v) = lookup("PRESENCE_MAX_FRAMES").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.spring.max_frames = v;
        }

        // Timing settings
        if let Some(v) = number("PRESENCE_DURATION_MS") {
            self.timing.default_duration_ms = v;
        }

        // Presence settings
        if let Some(v) = flag("PRESENCE_ANIMATE_FIRST_RENDER") {
            self.presence.animate_first_render = v;
        }
        if let Some(name) = lookup("PRESENCE_DEBUG_NAME") {
            self.presence.debug_name = name;
        }

        // Demo settings
        if let Some(v) = number("PRESENCE_FRAME_MS") {
            self.demo.frame_ms = v;
        }
        if let Some(v) = flag("PRESENCE_START_HIDDEN") {
            self.demo.start_hidden = v;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from presence.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PresenceConfig::default();
        assert_eq!(config.spring.stiffness, 150.0);
        assert_eq!(config.spring.mass, 3.0);
        assert_eq!(config.spring.damping, 27.0);
        assert_eq!(config.timing.default_duration_ms, 1000.0);
        assert!(config.presence.animate_first_render);
        assert_eq!(config.presence.debug_name, "unknown");
        assert!(config.variants.is_none());
    }

    #[test]
    fn test_toml_serialization() {
        let config = PresenceConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: PresenceConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[spring]
stiffness = 220.0

[variants]
y = {{ from = 40.0, to = 0.0 }}
opacity = {{ from = 0.0, to = 1.0 }}
scale = {{ mode = "additive", from = 0.5, to = 0.0 }}
"#
        )
        .unwrap();

        let config = PresenceConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.spring.stiffness, 220.0);
        assert_eq!(config.spring.damping, 27.0);

        let variants = config.variants.unwrap();
        assert_eq!(variants.y, Some(RangeConfig { from: 40.0, to: 0.0 }));
        assert!(variants.x.is_none());
        assert_eq!(variants.scale.unwrap().mode, ScaleModeConfig::Additive);
    }

    #[test]
    fn test_load_errors() {
        let missing = PresenceConfig::load_from_file("/definitely/not/here/presence.toml");
        assert!(matches!(missing, Err(ConfigError::Read(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[spring\nstiffness = ").unwrap();
        let broken = PresenceConfig::load_from_file(file.path());
        assert!(matches!(broken, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_merge_with_vars() {
        let vars: HashMap<&str, &str> = [
            ("PRESENCE_STIFFNESS", "300"),
            ("PRESENCE_DAMPING", "not-a-number"),
            ("PRESENCE_ANIMATE_FIRST_RENDER", "false"),
            ("PRESENCE_DEBUG_NAME", "sidebar"),
            ("PRESENCE_START_HIDDEN", "TRUE"),
        ]
        .into_iter()
        .collect();

        let mut config = PresenceConfig::default();
        config.merge_with_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.spring.stiffness, 300.0);
        assert_eq!(config.spring.damping, 27.0);
        assert!(!config.presence.animate_first_render);
        assert_eq!(config.presence.debug_name, "sidebar");
        assert!(config.demo.start_hidden);
    }
}
