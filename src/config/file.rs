//! Configuration file management.
//!
//! Configuration lives at `~/.config/tapedeck/tapedeck.toml`. A missing file
//! is not an error; defaults apply and the file is created on first save.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `tapedeck list-devices`
    /// - device name from `tapedeck list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested sample rate in Hz (the device rate wins if they differ)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Reference level in dBFS for 100% meter display (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_reference_level_db() -> i8 {
    -20
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            reference_level_db: default_reference_level_db(),
        }
    }
}

/// Pre-recording countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Seconds counted down before capture starts
    #[serde(default = "default_countdown_seconds")]
    pub seconds: u32,
}

fn default_countdown_seconds() -> u32 {
    3
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            seconds: default_countdown_seconds(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TapedeckConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
}

impl TapedeckConfig {
    /// Loads configuration, falling back to defaults when no file exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If an existing file cannot be read or contains malformed TOML
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}; using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: TapedeckConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file, creating the directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_path = home.join(".config").join("tapedeck").join("tapedeck.toml");

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TapedeckConfig::default();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.reference_level_db, -20);
        assert_eq!(config.countdown.seconds, 3);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TapedeckConfig = toml::from_str(
            r#"
            [countdown]
            seconds = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.countdown.seconds, 5);
        assert_eq!(config.audio.device, "default");
    }

    #[test]
    fn test_full_toml() {
        let config: TapedeckConfig = toml::from_str(
            r#"
            [audio]
            device = "2"
            sample_rate = 44100
            reference_level_db = -12

            [countdown]
            seconds = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.device, "2");
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.reference_level_db, -12);
        assert_eq!(config.countdown.seconds, 10);
    }

    #[test]
    fn test_serializes_roundtrip() {
        let config = TapedeckConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: TapedeckConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.countdown.seconds, config.countdown.seconds);
        assert_eq!(parsed.audio.device, config.audio.device);
    }
}
