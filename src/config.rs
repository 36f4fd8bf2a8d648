//! Configuration management
//!
//! Loads the YAML configuration file. Every field has a default, so a
//! missing file or an empty mapping yields a working configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::engine::EngineConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub midi: MidiConfig,
    pub engine: EngineConfig,
}

/// Serial transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Ports to read. Empty means auto-detect controller boards by their
    /// USB descriptor.
    pub ports: Vec<String>,
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            baud: default_baud(),
        }
    }
}

/// MIDI output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Output port name, matched by case-insensitive substring.
    pub output_port: String,
    /// MIDI channel 0-15.
    pub channel: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            output_port: default_output_port(),
            channel: 0,
        }
    }
}

fn default_baud() -> u32 {
    115_200
}

fn default_output_port() -> String {
    "theremin port".to_string()
}

impl AppConfig {
    /// Load configuration from file.
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        Ok(config)
    }

    /// Load from file if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            info!("Config file '{}' not found, using defaults", path);
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.serial.ports.is_empty());
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.midi.output_port, "theremin port");
        assert_eq!(config.midi.channel, 0);
        assert_eq!(config.engine.deadband, 2);
        assert_eq!(config.engine.octave_min, -24);
        assert_eq!(config.engine.octave_max, 36);
        assert_eq!(config.engine.default_volume, 96);
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
serial:
  ports: ["COM14"]
midi:
  output_port: "loopMIDI"
engine:
  deadband: 4
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.serial.ports, vec!["COM14".to_string()]);
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.midi.output_port, "loopMIDI");
        assert_eq!(config.engine.deadband, 4);
        assert_eq!(config.engine.octave_max, 36);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "serial:\n  baud: 9600").unwrap();

        let config = AppConfig::load_or_default(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.serial.baud, 9600);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_or_default("does-not-exist.yaml")
            .await
            .unwrap();
        assert_eq!(config.serial.baud, 115_200);
    }
}
